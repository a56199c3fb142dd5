use rand::prelude::*;
use rand_distr::Bernoulli;

/// Payoff of a lost bet.
///
/// Kept above zero so that fitness can always be used as a selection weight.
pub const FITNESS_FLOOR: f64 = 1e-10;

/// Agent of the simulation.
///
/// Each agent bets with probability `prob` and carries the payoff it
/// realized the last time it was evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    prob: f64,
    fitness: f64,
    born: usize,
}

impl Agent {
    /// Create an agent born in generation `born` that has not bet yet.
    pub fn new(prob: f64, born: usize) -> Self {
        debug_assert!(prob > 0.0 && prob <= 1.0);
        Self {
            prob,
            fitness: FITNESS_FLOOR,
            born,
        }
    }

    /// Create a generation-1 agent with a random betting probability.
    pub fn founder<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(draw_prob(rng), 1)
    }

    /// Create an offspring born in `generation`.
    ///
    /// The offspring inherits the betting probability, which is replaced by
    /// a fresh draw whenever `mut_dist` fires. Without `mut_dist` the
    /// offspring is an exact copy.
    pub fn offspring<R: Rng + ?Sized>(
        &self,
        generation: usize,
        mut_dist: Option<&Bernoulli>,
        rng: &mut R,
    ) -> Self {
        let mut prob = self.prob;
        if let Some(mut_dist) = mut_dist {
            if mut_dist.sample(rng) {
                prob = draw_prob(rng);
            }
        }
        Self::new(prob, generation)
    }

    /// Play one bet and store the realized payoff as fitness.
    ///
    /// A win pays `1 / prob`, so every betting probability has an expected
    /// payoff of 1.
    pub fn evaluate_fitness<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let r: f64 = rng.random_range(0.0..=1.0);
        self.fitness = if r <= self.prob {
            1.0 / self.prob
        } else {
            FITNESS_FLOOR
        };
    }

    pub fn prob(&self) -> f64 {
        self.prob
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn born(&self) -> usize {
        self.born
    }
}

/// Draw a betting probability uniformly from (0, 1].
pub fn draw_prob<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let prob = rng.random_range(0.0..=1.0);
        if prob != 0.0 {
            return prob;
        }
    }
}
