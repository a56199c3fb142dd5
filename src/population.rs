use crate::genealogy::{AgentId, Genealogy};
use crate::model::Agent;
use crate::stats::{Accumulator, GroupStats};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_distr::{Bernoulli, Uniform, weighted::WeightedIndex};

/// Copy of an agent sent from one group slot to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub src_group: usize,
    pub src_slot: usize,
    pub dst_group: usize,
    pub dst_slot: usize,
}

/// Groups of equal size holding the living agents, plus their ancestry.
pub struct Population {
    genealogy: Genealogy,
    groups: Vec<Vec<AgentId>>,
}

impl Population {
    /// Fill `n_groups` groups of `group_size` founders each.
    pub fn new<R: Rng + ?Sized>(n_groups: usize, group_size: usize, rng: &mut R) -> Self {
        let mut genealogy = Genealogy::new();
        let mut groups = Vec::with_capacity(n_groups);
        for _ in 0..n_groups {
            let mut group = Vec::with_capacity(group_size);
            for _ in 0..group_size {
                group.push(genealogy.add_founder(Agent::founder(rng)));
            }
            groups.push(group);
        }
        Self { genealogy, groups }
    }

    pub fn groups(&self) -> &[Vec<AgentId>] {
        &self.groups
    }

    pub fn genealogy(&self) -> &Genealogy {
        &self.genealogy
    }

    #[cfg(test)]
    pub fn agent(&self, id: AgentId) -> Result<&Agent> {
        self.genealogy.agent(id)
    }

    /// Let one agent bet again.
    pub fn evaluate_agent<R: Rng + ?Sized>(&mut self, id: AgentId, rng: &mut R) -> Result<()> {
        self.genealogy.agent_mut(id)?.evaluate_fitness(rng);
        Ok(())
    }

    /// Let every agent of a group bet and summarize the payoffs.
    pub fn evaluate_group<R: Rng + ?Sized>(
        &mut self,
        i_group: usize,
        rng: &mut R,
    ) -> Result<GroupStats> {
        let mut fitness_acc = Accumulator::new();
        let mut prob_acc = Accumulator::new();
        let mut best: Option<(AgentId, f64, f64)> = None;

        for &id in &self.groups[i_group] {
            let agt = self.genealogy.agent_mut(id)?;
            agt.evaluate_fitness(rng);

            fitness_acc.add(agt.fitness());
            prob_acc.add(agt.prob());

            // Strict comparison keeps the first agent among ties.
            if best.is_none_or(|(_, max_fitness, _)| agt.fitness() > max_fitness) {
                best = Some((id, agt.fitness(), agt.prob()));
            }
        }

        let (best, max_fitness, best_prob) = best.context("group is empty")?;

        Ok(GroupStats {
            avg_fitness: fitness_acc.mean(),
            std_dev_fitness: fitness_acc.std_dev(),
            max_fitness,
            best,
            best_prob,
            avg_prob: prob_acc.mean(),
        })
    }

    /// Build the next generation of a group by fitness-proportional selection.
    ///
    /// The returned group holds one reference on each new agent; install it
    /// with [`Population::retire_group`].
    pub fn reproduce_group<R: Rng + ?Sized>(
        &mut self,
        i_group: usize,
        generation: usize,
        mut_dist: &Bernoulli,
        max_draws: usize,
        rng: &mut R,
    ) -> Result<Vec<AgentId>> {
        let group = &self.groups[i_group];
        let fitness = group
            .iter()
            .map(|&id| self.genealogy.agent(id).map(Agent::fitness))
            .collect::<Result<Vec<_>>>()?;
        let max_fitness = fitness.iter().copied().fold(f64::MIN, f64::max);

        let mut new_group = Vec::with_capacity(group.len());
        for i_agt in 0..group.len() {
            let i_parent = select_parent(&fitness, i_agt, max_fitness, max_draws, rng)
                .context("failed to select parent")?;
            let child = reproduce(
                &mut self.genealogy,
                group[i_parent],
                generation,
                Some(mut_dist),
                rng,
            )?;
            new_group.push(child);
        }

        Ok(new_group)
    }

    /// Replace a group with its next generation, releasing the old agents.
    pub fn retire_group(&mut self, i_group: usize, new_group: Vec<AgentId>) -> Result<()> {
        if new_group.len() != self.groups[i_group].len() {
            bail!("new group must have {} agents", self.groups[i_group].len());
        }
        let old_group = std::mem::replace(&mut self.groups[i_group], new_group);
        for id in old_group {
            self.genealogy
                .release(id)
                .context("failed to release retired agent")?;
        }
        Ok(())
    }

    /// Send unmutated clones of randomly chosen agents to other groups.
    ///
    /// Groups and slots are visited in order and every clone overwrites a
    /// random slot of a random other group, so later migrants may overwrite
    /// earlier ones.
    pub fn migrate<R: Rng + ?Sized>(
        &mut self,
        generation: usize,
        mig_dist: &Bernoulli,
        rng: &mut R,
    ) -> Result<Vec<Migration>> {
        let n_groups = self.groups.len();
        let mut migrations = Vec::new();
        if n_groups < 2 {
            return Ok(migrations);
        }

        let group_size = self.groups[0].len();
        let dst_group_dist = Uniform::new(0, n_groups - 1)?;
        let dst_slot_dist = Uniform::new(0, group_size)?;

        for src_group in 0..n_groups {
            for src_slot in 0..group_size {
                if !mig_dist.sample(rng) {
                    continue;
                }

                let src = self.groups[src_group][src_slot];
                let clone = reproduce(&mut self.genealogy, src, generation, None, rng)
                    .context("failed to clone migrant")?;

                // Skip over the source group to stay uniform over the others.
                let mut dst_group = dst_group_dist.sample(rng);
                if dst_group >= src_group {
                    dst_group += 1;
                }
                let dst_slot = dst_slot_dist.sample(rng);

                let old = std::mem::replace(&mut self.groups[dst_group][dst_slot], clone);
                self.genealogy
                    .release(old)
                    .context("failed to release displaced agent")?;

                migrations.push(Migration {
                    src_group,
                    src_slot,
                    dst_group,
                    dst_slot,
                });
            }
        }

        Ok(migrations)
    }
}

/// Pick the parent for slot `exclude` by roulette-wheel selection.
///
/// Candidates other than `exclude` are drawn uniformly and accepted with
/// probability `fitness / max_fitness`. After `max_draws` rejected draws the
/// parent is drawn directly from the same distribution. A group of one is
/// its own parent.
pub fn select_parent<R: Rng + ?Sized>(
    fitness: &[f64],
    exclude: usize,
    max_fitness: f64,
    max_draws: usize,
    rng: &mut R,
) -> Result<usize> {
    let n_agt = fitness.len();
    match n_agt {
        0 => bail!("cannot select from an empty group"),
        1 => return Ok(0),
        _ => {}
    }

    let idx_dist = Uniform::new(0, n_agt)?;
    for _ in 0..max_draws {
        let idx = idx_dist.sample(rng);
        if idx == exclude {
            continue;
        }
        let threshold: f64 = rng.random_range(0.0..=1.0);
        if threshold <= fitness[idx] / max_fitness {
            return Ok(idx);
        }
    }

    let weights = fitness
        .iter()
        .enumerate()
        .map(|(idx, &val)| if idx == exclude { 0.0 } else { val });
    let dist = WeightedIndex::new(weights).context("failed to build selection weights")?;
    Ok(dist.sample(rng))
}

fn reproduce<R: Rng + ?Sized>(
    genealogy: &mut Genealogy,
    parent: AgentId,
    generation: usize,
    mut_dist: Option<&Bernoulli>,
    rng: &mut R,
) -> Result<AgentId> {
    let child = genealogy.agent(parent)?.offspring(generation, mut_dist, rng);
    genealogy.add_child(parent, child)
}
