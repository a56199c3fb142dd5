use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Defaults can be overridden by a TOML file (see [`Config::from_file`])
/// and then by command-line flags. Call [`Config::validate`] once all
/// overrides have been applied.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Total number of agents over all groups.
    pub population_size: usize,
    /// Number of groups the population is split into.
    pub n_groups: usize,

    /// Number of generations to run.
    pub generations: usize,

    /// Probability that an offspring draws a new betting probability.
    pub mutation_rate: f64,
    /// Probability that an agent sends a clone to another group.
    pub migration_rate: f64,

    /// Random seed (drawn from OS entropy when absent).
    pub seed: Option<i64>,

    /// Number of generations between progress reports.
    pub report_every: usize,
    /// Rejection draws tried per selection before drawing exactly.
    pub max_draws: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            population_size: 16_000,
            n_groups: 1,
            generations: 10_000,
            mutation_rate: 0.1,
            migration_rate: 0.0,
            seed: None,
            report_every: 1000,
            max_draws: 10_000,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Missing fields take their default value. The result is not
    /// validated, since command-line flags may still override it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or deserialized.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        Ok(config)
    }

    /// Check every parameter, including that groups have equal size.
    pub fn validate(&self) -> Result<()> {
        check_num(self.population_size, 1..).context("invalid population size")?;
        check_num(self.n_groups, 1..).context("invalid number of groups")?;
        if self.population_size % self.n_groups != 0 {
            bail!(
                "population size ({}) must be evenly divisible by the number of groups ({})",
                self.population_size,
                self.n_groups
            );
        }

        check_num(self.generations, 1..).context("invalid number of generations")?;

        check_num(self.mutation_rate, 0.0..=1.0).context("invalid mutation rate")?;
        check_num(self.migration_rate, 0.0..=1.0).context("invalid migration rate")?;

        check_num(self.report_every, 1..).context("invalid report interval")?;

        Ok(())
    }

    /// Number of agents in each group.
    pub fn group_size(&self) -> usize {
        self.population_size / self.n_groups
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(population_size: usize, n_groups: usize) -> Config {
        Config {
            population_size,
            n_groups,
            ..Config::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn uneven_groups_are_rejected() {
        let err = config(100, 3).validate().unwrap_err();
        assert!(format!("{err:#}").contains("evenly divisible"));
    }

    #[test]
    fn even_groups_are_accepted() {
        let cfg = config(100, 4);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.group_size(), 25);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut cfg = config(100, 1);
        cfg.migration_rate = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = config(100, 1);
        cfg.migration_rate = -0.1;
        assert!(cfg.validate().is_err());

        let mut cfg = config(100, 1);
        cfg.generations = 0;
        assert!(cfg.validate().is_err());

        assert!(config(0, 1).validate().is_err());
        assert!(config(100, 0).validate().is_err());
    }

    #[test]
    fn toml_fields_override_defaults() {
        let cfg: Config = toml::from_str(
            "population_size = 40\n\
             n_groups = 2\n\
             migration_rate = 0.25\n\
             seed = -7\n",
        )
        .unwrap();
        assert_eq!(cfg.population_size, 40);
        assert_eq!(cfg.n_groups, 2);
        assert_eq!(cfg.migration_rate, 0.25);
        assert_eq!(cfg.seed, Some(-7));
        assert_eq!(cfg.generations, Config::default().generations);
    }

    #[test]
    fn unknown_toml_fields_are_rejected() {
        assert!(toml::from_str::<Config>("n_agents = 3\n").is_err());
    }
}
