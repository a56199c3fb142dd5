mod config;
mod engine;
mod genealogy;
mod lod;
mod model;
mod population;
mod stats;

use crate::config::Config;
use crate::engine::Engine;
use crate::lod::save_lod;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// TOML configuration file; flags below take precedence over it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file for the line of descent.
    #[arg(short = 'e', long)]
    lod_file: Option<PathBuf>,

    #[arg(short = 's', long, allow_negative_numbers = true)]
    seed: Option<i64>,

    #[arg(short = 'g', long)]
    generations: Option<usize>,

    #[arg(short = 'p', long)]
    population_size: Option<usize>,

    #[arg(short = 'n', long)]
    n_groups: Option<usize>,

    #[arg(short = 'm', long, allow_negative_numbers = true)]
    migration_rate: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    mutation_rate: Option<f64>,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let cfg = build_config(&args).context("failed to construct cfg")?;
    log::info!("{cfg:#?}");

    let mut engine = Engine::new(cfg).context("failed to construct engine")?;
    log::info!("setup complete");

    log::info!("starting evolution");
    engine
        .run_simulation()
        .context("failed to run simulation")?;

    let avg_fitness = engine.avg_fitness();
    log::info!(
        "completed {} generations, group 0 average fitness {} (std dev {}), {} agents in ancestry",
        engine.generation(),
        avg_fitness.mean(),
        avg_fitness.std_dev(),
        engine.ancestry_size()
    );

    log::info!("building ancestor list");
    let records = engine
        .line_of_descent()
        .context("failed to build line of descent")?;

    log::info!("analyzing ancestor list");
    match &args.lod_file {
        Some(lod_file) => {
            save_lod(lod_file, &records)
                .with_context(|| format!("failed to save {lod_file:?}"))?;
            log::info!("saved {} ancestors to {lod_file:?}", records.len());
        }
        None => log::warn!("no line of descent file given, skipping output"),
    }

    Ok(())
}

fn build_config(args: &CLI) -> Result<Config> {
    let mut cfg = match &args.config {
        Some(file) => Config::from_file(file)?,
        None => Config::default(),
    };

    if let Some(seed) = args.seed {
        cfg.seed = Some(seed);
    }
    if let Some(generations) = args.generations {
        cfg.generations = generations;
    }
    if let Some(population_size) = args.population_size {
        cfg.population_size = population_size;
    }
    if let Some(n_groups) = args.n_groups {
        cfg.n_groups = n_groups;
    }
    if let Some(migration_rate) = args.migration_rate {
        cfg.migration_rate = migration_rate;
    }
    if let Some(mutation_rate) = args.mutation_rate {
        cfg.mutation_rate = mutation_rate;
    }

    Ok(cfg)
}
