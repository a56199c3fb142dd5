use crate::config::Config;
use crate::lod::{LodRecord, extract_lod};
use crate::population::Population;
use crate::stats::{Accumulator, GroupStats};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Bernoulli;

/// Simulation engine.
///
/// Holds the configuration, the population, and the random number generator,
/// and runs the generation loop.
pub struct Engine {
    cfg: Config,
    pop: Population,
    rng: ChaCha12Rng,
    generation: usize,
    stats_vec: Vec<GroupStats>,
    avg_fitness: Accumulator,
}

impl Engine {
    /// Create a new `Engine` with a population of founders.
    ///
    /// The configuration is validated here, before anything is built.
    /// Without a configured seed one is drawn from OS entropy and logged.
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let seed = cfg.seed.unwrap_or_else(rand::random);
        log::info!("seed = {seed}");
        let mut rng = ChaCha12Rng::seed_from_u64(seed as u64);

        let pop = Population::new(cfg.n_groups, cfg.group_size(), &mut rng);

        Ok(Self {
            cfg,
            pop,
            rng,
            generation: 0,
            stats_vec: Vec::new(),
            avg_fitness: Accumulator::new(),
        })
    }

    /// Run every remaining generation.
    pub fn run_simulation(&mut self) -> Result<()> {
        while !self.is_done() {
            self.perform_step()
                .with_context(|| format!("failed to perform generation {}", self.generation))?;
        }
        Ok(())
    }

    /// Whether the configured number of generations has been run.
    pub fn is_done(&self) -> bool {
        self.generation >= self.cfg.generations
    }

    /// Run one generation.
    pub fn perform_step(&mut self) -> Result<()> {
        self.generation += 1;
        let generation = self.generation;

        let mut stats_vec = Vec::with_capacity(self.cfg.n_groups);
        for i_group in 0..self.cfg.n_groups {
            let stats = self
                .pop
                .evaluate_group(i_group, &mut self.rng)
                .with_context(|| format!("failed to evaluate group {i_group}"))?;
            stats_vec.push(stats);
        }

        if generation == 1 || generation % self.cfg.report_every == 0 {
            let stats = &stats_vec[0];
            log::info!(
                "generation {generation}: betting agent [{} : {}] {}",
                stats.avg_fitness,
                stats.max_fitness,
                stats.best_prob
            );
        }
        for (i_group, stats) in stats_vec.iter().enumerate() {
            log::debug!(
                "generation {generation}, group {i_group}: fitness {} +- {}, max {} ({:?}), probability {}",
                stats.avg_fitness,
                stats.std_dev_fitness,
                stats.max_fitness,
                stats.best,
                stats.avg_prob
            );
        }
        self.avg_fitness.add(stats_vec[0].avg_fitness);
        self.stats_vec = stats_vec;

        let mut_dist = Bernoulli::new(self.cfg.mutation_rate)?;
        for i_group in 0..self.cfg.n_groups {
            let new_group = self
                .pop
                .reproduce_group(
                    i_group,
                    generation,
                    &mut_dist,
                    self.cfg.max_draws,
                    &mut self.rng,
                )
                .with_context(|| format!("failed to reproduce group {i_group}"))?;
            self.pop
                .retire_group(i_group, new_group)
                .with_context(|| format!("failed to retire group {i_group}"))?;
        }

        let mig_dist = Bernoulli::new(self.cfg.migration_rate)?;
        let migrations = self
            .pop
            .migrate(generation, &mig_dist, &mut self.rng)
            .context("failed to migrate agents")?;
        for migration in &migrations {
            log::trace!(
                "migrant from group {} slot {} to group {} slot {}",
                migration.src_group,
                migration.src_slot,
                migration.dst_group,
                migration.dst_slot
            );
        }
        log::debug!(
            "generation {generation}: {} migrations, {} agents in ancestry",
            migrations.len(),
            self.ancestry_size()
        );

        Ok(())
    }

    /// Line of descent of the agent in the first slot of the first group.
    ///
    /// That agent bets once more first, so its fitness is current.
    pub fn line_of_descent(&mut self) -> Result<Vec<LodRecord>> {
        let id = self.pop.groups()[0][0];
        self.pop
            .evaluate_agent(id, &mut self.rng)
            .context("failed to evaluate final agent")?;
        extract_lod(self.pop.genealogy(), id).context("failed to extract line of descent")
    }

    #[cfg(test)]
    pub fn population(&self) -> &Population {
        &self.pop
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Statistics of every group in the latest generation.
    pub fn stats(&self) -> &[GroupStats] {
        &self.stats_vec
    }

    /// Running summary of group 0's average fitness over all generations.
    pub fn avg_fitness(&self) -> &Accumulator {
        &self.avg_fitness
    }

    /// Number of agents kept alive by the population and its ancestry.
    pub fn ancestry_size(&self) -> usize {
        self.pop.genealogy().len()
    }
}
