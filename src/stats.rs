use crate::genealogy::AgentId;

/// Online mean and variance (Welford).
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn n_vals(&self) -> usize {
        self.n_vals
    }

    pub fn mean(&self) -> f64 {
        if self.n_vals > 0 { self.mean } else { f64::NAN }
    }

    pub fn std_dev(&self) -> f64 {
        if self.n_vals > 1 {
            (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
        } else {
            f64::NAN
        }
    }
}

/// Fitness summary of one group in one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub avg_fitness: f64,
    pub std_dev_fitness: f64,
    pub max_fitness: f64,
    /// First agent reaching `max_fitness`.
    pub best: AgentId,
    pub best_prob: f64,
    pub avg_prob: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_matches_direct_formulas() {
        let vals = [1.0, 4.0, 2.5, 8.0, 0.5];
        let mut acc = Accumulator::new();
        vals.iter().for_each(|&val| acc.add(val));

        let mean = vals.iter().sum::<f64>() / vals.len() as f64;
        let var = vals.iter().map(|val| (val - mean).powi(2)).sum::<f64>() / 4.0;
        assert!((acc.mean() - mean).abs() < 1e-12);
        assert!((acc.std_dev() - var.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn accumulator_undefined_without_data() {
        let mut acc = Accumulator::new();
        assert!(acc.mean().is_nan());
        acc.add(3.0);
        assert_eq!(acc.mean(), 3.0);
        assert!(acc.std_dev().is_nan());
    }
}
