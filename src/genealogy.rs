//! Reference-counted ancestry of all agents that are still needed.

use crate::model::Agent;
use anyhow::{Context, Result};

/// Handle to an agent stored in a [`Genealogy`].
///
/// The stamp tells a live agent apart from a collected agent whose slot has
/// been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId {
    idx: usize,
    stamp: u32,
}

struct Node {
    agent: Agent,
    parent: Option<AgentId>,
    n_refs: usize,
}

struct Slot {
    stamp: u32,
    node: Option<Node>,
}

/// Arena holding every agent reachable from the current population.
///
/// Each agent counts one reference per child pointing at it, plus one while
/// it occupies a population slot. An agent is collected when its count drops
/// to zero, which releases its own parent in turn.
#[derive(Default)]
pub struct Genealogy {
    slots: Vec<Slot>,
    free: Vec<usize>,
    n_live: usize,
}

impl Genealogy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a founder, referenced once by the slot that will hold it.
    pub fn add_founder(&mut self, agent: Agent) -> AgentId {
        self.insert(Node {
            agent,
            parent: None,
            n_refs: 1,
        })
    }

    /// Store a child of `parent`, referenced once by the slot that will hold it.
    pub fn add_child(&mut self, parent: AgentId, agent: Agent) -> Result<AgentId> {
        self.node_mut(parent)?.n_refs += 1;
        Ok(self.insert(Node {
            agent,
            parent: Some(parent),
            n_refs: 1,
        }))
    }

    /// Drop one reference to `id`, collecting every ancestor left unreferenced.
    pub fn release(&mut self, id: AgentId) -> Result<()> {
        let mut next = Some(id);
        while let Some(id) = next {
            let node = self
                .node_mut(id)
                .with_context(|| format!("failed to release {id:?}"))?;
            node.n_refs -= 1;
            if node.n_refs > 0 {
                break;
            }

            let slot = &mut self.slots[id.idx];
            next = slot.node.take().and_then(|node| node.parent);
            slot.stamp = slot.stamp.wrapping_add(1);
            self.free.push(id.idx);
            self.n_live -= 1;
        }
        Ok(())
    }

    pub fn agent(&self, id: AgentId) -> Result<&Agent> {
        Ok(&self.node(id)?.agent)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent> {
        Ok(&mut self.node_mut(id)?.agent)
    }

    pub fn parent(&self, id: AgentId) -> Result<Option<AgentId>> {
        Ok(self.node(id)?.parent)
    }

    /// Number of references held on `id`, or `None` once it is collected.
    #[cfg(test)]
    pub fn n_refs(&self, id: AgentId) -> Option<usize> {
        self.node(id).ok().map(|node| node.n_refs)
    }

    #[cfg(test)]
    pub fn contains(&self, id: AgentId) -> bool {
        self.node(id).is_ok()
    }

    /// Number of agents currently stored.
    pub fn len(&self) -> usize {
        self.n_live
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.n_live == 0
    }

    fn insert(&mut self, node: Node) -> AgentId {
        self.n_live += 1;
        match self.free.pop() {
            Some(idx) => {
                let slot = &mut self.slots[idx];
                slot.node = Some(node);
                AgentId {
                    idx,
                    stamp: slot.stamp,
                }
            }
            None => {
                self.slots.push(Slot {
                    stamp: 0,
                    node: Some(node),
                });
                AgentId {
                    idx: self.slots.len() - 1,
                    stamp: 0,
                }
            }
        }
    }

    fn node(&self, id: AgentId) -> Result<&Node> {
        self.slots
            .get(id.idx)
            .filter(|slot| slot.stamp == id.stamp)
            .and_then(|slot| slot.node.as_ref())
            .with_context(|| format!("agent {id:?} is not alive"))
    }

    fn node_mut(&mut self, id: AgentId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.idx)
            .filter(|slot| slot.stamp == id.stamp)
            .and_then(|slot| slot.node.as_mut())
            .with_context(|| format!("agent {id:?} is not alive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn chain(tree: &mut Genealogy, len: usize) -> Vec<AgentId> {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let root = tree.add_founder(Agent::founder(&mut rng));
        let mut ids = vec![root];
        for generation in 2..=len {
            let parent = *ids.last().unwrap();
            let child = tree.agent(parent).unwrap().offspring(generation, None, &mut rng);
            ids.push(tree.add_child(parent, child).unwrap());
            // The parent leaves the population once its child replaces it.
            tree.release(parent).unwrap();
        }
        ids
    }

    #[test]
    fn chain_is_kept_while_tip_lives() {
        let mut tree = Genealogy::new();
        let ids = chain(&mut tree, 100);
        assert_eq!(tree.len(), 100);
        for &id in &ids {
            assert_eq!(tree.n_refs(id), Some(1));
        }
    }

    #[test]
    fn releasing_tip_collects_whole_chain() {
        let mut tree = Genealogy::new();
        let ids = chain(&mut tree, 100);
        tree.release(*ids.last().unwrap()).unwrap();
        assert!(tree.is_empty());
        assert!(ids.iter().all(|&id| !tree.contains(id)));
    }

    #[test]
    fn shared_ancestor_survives_until_last_child_goes() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let mut tree = Genealogy::new();
        let root = tree.add_founder(Agent::founder(&mut rng));
        let agt = tree.agent(root).unwrap().clone();
        let a = tree.add_child(root, agt.offspring(2, None, &mut rng)).unwrap();
        let b = tree.add_child(root, agt.offspring(2, None, &mut rng)).unwrap();
        tree.release(root).unwrap();
        assert_eq!(tree.n_refs(root), Some(2));

        tree.release(a).unwrap();
        assert!(!tree.contains(a));
        assert_eq!(tree.n_refs(root), Some(1));

        tree.release(b).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn double_release_is_an_error() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let mut tree = Genealogy::new();
        let id = tree.add_founder(Agent::founder(&mut rng));
        tree.release(id).unwrap();
        assert!(tree.release(id).is_err());

        // The slot is reused, yet the stale handle stays dead.
        let other = tree.add_founder(Agent::founder(&mut rng));
        assert!(tree.release(id).is_err());
        assert!(tree.agent(id).is_err());
        assert_eq!(tree.n_refs(other), Some(1));
    }
}
