// Radicle Registry
// Copyright (C) 2019 Monadic GmbH <radicle@monadic.xyz>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as
// published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Random walks over a weighted copy of the ledger graph.

use std::collections::BTreeMap;

use rand::Rng;

use oscoin_ledger_core::api::{GraphReader, Interrupt};
use oscoin_ledger_core::graph::{Direction, EdgeData, EdgeKind, NodeId, NodeKind};
use oscoin_ledger_core::{hash_of, H256};

use crate::params::HyperParameters;

/// Transition to another node with its unnormalized weight.
#[derive(Clone, Debug, PartialEq)]
struct Step {
    target: usize,
    weight: f64,
}

#[derive(Clone, Debug)]
struct WalkNode {
    id: NodeId,
    damping: f64,
    steps: Vec<Step>,
    total_weight: f64,
}

/// The nodes of a graph in id order with the weighted steps a walk can take from each.
#[derive(Clone, Debug)]
pub struct WalkGraph {
    nodes: Vec<WalkNode>,
}

/// Walk was stopped by the interrupt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Interrupted;

fn kind_weight(params: &HyperParameters, from: NodeKind, kind: EdgeKind) -> f64 {
    let weights = &params.edge_weights;
    match (from, kind) {
        (NodeKind::Project, EdgeKind::Dependency) => weights.dependency,
        (NodeKind::Project, EdgeKind::Maintenance) => weights.maintainer,
        (NodeKind::Project, EdgeKind::Contribution) => weights.contributor,
        (NodeKind::Contributor, EdgeKind::Maintenance) => weights.maintained_project,
        (NodeKind::Contributor, EdgeKind::Contribution) => weights.contributed_project,
        (NodeKind::Contributor, EdgeKind::Dependency) => 0.0,
    }
}

impl WalkGraph {
    pub fn new(reader: &dyn GraphReader, params: &HyperParameters) -> Self {
        let ids = reader
            .nodes(None)
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();
        let index = ids
            .iter()
            .enumerate()
            .map(|(position, id)| (id.clone(), position))
            .collect::<BTreeMap<_, _>>();

        let nodes = ids
            .into_iter()
            .map(|id| {
                let kind = id.kind();
                // Edges of one kind share the kind weight. Contributions are shared by count.
                let mut by_kind: BTreeMap<EdgeKind, Vec<(usize, f64)>> = BTreeMap::new();
                // Walks follow dependencies in their direction only.
                let outgoing = reader.neighbors(&id, Direction::Outgoing, None);
                let incoming = reader
                    .neighbors(&id, Direction::Incoming, None)
                    .filter(|neighbor| neighbor.edge.kind != EdgeKind::Dependency);
                for neighbor in outgoing.chain(incoming) {
                    let share = match neighbor.data {
                        EdgeData::Contribution { count, .. } => f64::from(*count),
                        _ => 1.0,
                    };
                    if let Some(target) = index.get(neighbor.node) {
                        by_kind
                            .entry(neighbor.edge.kind)
                            .or_default()
                            .push((*target, share));
                    }
                }

                let mut steps = Vec::new();
                for (edge_kind, targets) in by_kind {
                    let weight = kind_weight(params, kind, edge_kind);
                    let shares = targets.iter().map(|(_, share)| share).sum::<f64>();
                    if weight <= 0.0 || shares <= 0.0 {
                        continue;
                    }
                    steps.extend(targets.into_iter().map(|(target, share)| Step {
                        target,
                        weight: weight * share / shares,
                    }));
                }
                let damping = match kind {
                    NodeKind::Project => params.project_damping_factor,
                    NodeKind::Contributor => params.contributor_damping_factor,
                };
                WalkNode {
                    id,
                    damping,
                    total_weight: steps.iter().map(|step| step.weight).sum(),
                    steps,
                }
            })
            .collect();
        WalkGraph { nodes }
    }

    /// Hash over the nodes and weighted steps. Node data that walks ignore, like previous
    /// ranks, does not change it.
    pub fn hash(&self) -> H256 {
        let topology = self
            .nodes
            .iter()
            .map(|node| {
                let steps = node
                    .steps
                    .iter()
                    .map(|step| (step.target as u64, step.weight.to_bits()))
                    .collect::<Vec<_>>();
                (&node.id, node.damping.to_bits(), steps)
            })
            .collect::<Vec<_>>();
        hash_of(&topology)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_id(&self, position: usize) -> &NodeId {
        &self.nodes[position].id
    }

    /// The graph without the nodes for which `keep` is false and without the steps into them.
    pub fn retain(&self, keep: &[bool]) -> Self {
        let mut positions = vec![None; self.nodes.len()];
        let mut next = 0;
        for (position, kept) in keep.iter().enumerate() {
            if *kept {
                positions[position] = Some(next);
                next += 1;
            }
        }
        let nodes = self
            .nodes
            .iter()
            .zip(keep)
            .filter(|(_, kept)| **kept)
            .map(|(node, _)| {
                let steps = node
                    .steps
                    .iter()
                    .filter_map(|step| {
                        positions[step.target].map(|target| Step {
                            target,
                            weight: step.weight,
                        })
                    })
                    .collect::<Vec<_>>();
                WalkNode {
                    id: node.id.clone(),
                    damping: node.damping,
                    total_weight: steps.iter().map(|step| step.weight).sum(),
                    steps,
                }
            })
            .collect();
        WalkGraph { nodes }
    }

    fn step(&self, from: usize, rng: &mut impl Rng) -> Option<usize> {
        let node = &self.nodes[from];
        if node.steps.is_empty() || !rng.gen_bool(node.damping) {
            return None;
        }
        let mut remaining = rng.gen::<f64>() * node.total_weight;
        for step in &node.steps {
            if remaining < step.weight {
                return Some(step.target);
            }
            remaining -= step.weight;
        }
        node.steps.last().map(|step| step.target)
    }

    /// Visit frequencies of `walks_per_node` walks started from every node, in node order.
    ///
    /// Frequencies are visit counts divided by the total number of visits.
    pub fn walk(
        &self,
        walks_per_node: u32,
        rng: &mut impl Rng,
        interrupt: &Interrupt,
    ) -> Result<Vec<f64>, Interrupted> {
        let mut visits = vec![0u64; self.nodes.len()];
        for start in 0..self.nodes.len() {
            if interrupt.is_interrupted() {
                return Err(Interrupted);
            }
            for _ in 0..walks_per_node {
                let mut current = start;
                visits[current] += 1;
                while let Some(next) = self.step(current, rng) {
                    current = next;
                    visits[current] += 1;
                }
            }
        }
        let total = visits.iter().sum::<u64>();
        if total == 0 {
            return Ok(vec![0.0; visits.len()]);
        }
        Ok(visits
            .into_iter()
            .map(|count| count as f64 / total as f64)
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use oscoin_ledger_core::api::{GraphDataWriter, GraphWriter};
    use oscoin_ledger_core::graph::{
        ContractType, ContributorData, EdgeId, NodeData, Osrank, ProjectData,
    };
    use oscoin_ledger_core::{Fingerprint, Id};
    use oscoin_ledger_runtime::{CheckpointManager, RuntimeConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;
    use std::convert::TryFrom;

    fn id(s: &str) -> Id {
        Id::try_from(s).unwrap()
    }

    fn project(osrank: u64) -> NodeData {
        NodeData::Project(ProjectData {
            osrank: Osrank(osrank),
            contract: ContractType::Standard,
            account: id("treasury"),
        })
    }

    fn contribution(count: u32) -> EdgeData {
        EdgeData::Contribution {
            index: 0,
            count,
            key: Fingerprint([0; 20]),
            verified: true,
        }
    }

    /// Project `a` depends on `b`. `alice` contributed once to `a`, `bob` three times.
    fn manager() -> CheckpointManager {
        let mut manager = CheckpointManager::new(&RuntimeConfig::default());
        let mut batch = manager.begin();
        batch.add_node(NodeId::Project(id("a")), project(0)).unwrap();
        batch.add_node(NodeId::Project(id("b")), project(0)).unwrap();
        for contributor in &["alice", "bob"] {
            batch
                .add_node(
                    NodeId::Contributor(id(contributor)),
                    NodeData::Contributor(ContributorData::default()),
                )
                .unwrap();
        }
        batch
            .add_edge(
                EdgeId::dependency(id("a"), id("b")),
                EdgeData::Dependency {
                    checkpoint: H256::zero(),
                },
            )
            .unwrap();
        batch
            .add_edge(EdgeId::contribution(id("alice"), id("a")), contribution(1))
            .unwrap();
        batch
            .add_edge(EdgeId::contribution(id("bob"), id("a")), contribution(3))
            .unwrap();
        manager.commit(batch, None).unwrap();
        manager
    }

    fn position(graph: &WalkGraph, node: &NodeId) -> usize {
        (0..graph.len())
            .find(|position| graph.node_id(*position) == node)
            .unwrap()
    }

    #[test]
    fn steps_are_weighted_by_kind_and_count() {
        let params = HyperParameters::default();
        let graph = WalkGraph::new(&manager().snapshot(), &params);
        assert_eq!(graph.len(), 4);

        let a = &graph.nodes[position(&graph, &NodeId::Project(id("a")))];
        let weight_to = |node: NodeId| {
            let target = position(&graph, &node);
            a.steps
                .iter()
                .find(|step| step.target == target)
                .map(|step| step.weight)
                .unwrap()
        };
        let contributor = params.edge_weights.contributor;
        assert_eq!(
            weight_to(NodeId::Project(id("b"))),
            params.edge_weights.dependency
        );
        assert!((weight_to(NodeId::Contributor(id("alice"))) - contributor / 4.0).abs() < 1e-12);
        assert!((weight_to(NodeId::Contributor(id("bob"))) - contributor * 0.75).abs() < 1e-12);

        // Dependencies are not walked backwards.
        let b = &graph.nodes[position(&graph, &NodeId::Project(id("b")))];
        assert!(b.steps.is_empty());
    }

    #[test]
    fn frequencies_sum_to_one() {
        let graph = WalkGraph::new(&manager().snapshot(), &HyperParameters::default());
        let mut rng = ChaChaRng::from_seed([3; 32]);
        let ranks = graph.walk(10, &mut rng, &Interrupt::new()).unwrap();
        assert_eq!(ranks.len(), 4);
        assert!((ranks.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn retain_drops_steps_into_removed_nodes() {
        let graph = WalkGraph::new(&manager().snapshot(), &HyperParameters::default());
        let b = position(&graph, &NodeId::Project(id("b")));
        let keep = (0..graph.len()).map(|position| position != b).collect::<Vec<_>>();
        let pruned = graph.retain(&keep);
        assert_eq!(pruned.len(), 3);
        let a = &pruned.nodes[position(&pruned, &NodeId::Project(id("a")))];
        assert_eq!(a.steps.len(), 2);
        assert!(a.steps.iter().all(|step| step.target < pruned.len()));
    }

    #[test]
    fn hash_ignores_ranks() {
        let mut manager = manager();
        let params = HyperParameters::default();
        let before = WalkGraph::new(&manager.snapshot(), &params).hash();

        let mut batch = manager.begin();
        batch
            .update_node_data(&NodeId::Project(id("a")), project(42))
            .unwrap();
        manager.commit(batch, None).unwrap();
        let snapshot = manager.snapshot();
        assert_eq!(WalkGraph::new(&snapshot, &params).hash(), before);

        let mut batch = manager.begin();
        batch
            .add_node(NodeId::Project(id("c")), project(0))
            .unwrap();
        manager.commit(batch, None).unwrap();
        assert_ne!(WalkGraph::new(&manager.snapshot(), &params).hash(), before);
    }

    #[test]
    fn interrupt_stops_walks() {
        let graph = WalkGraph::new(&manager().snapshot(), &HyperParameters::default());
        let interrupt = Interrupt::new();
        interrupt.cancel();
        let mut rng = ChaChaRng::from_seed([0; 32]);
        assert_eq!(graph.walk(10, &mut rng, &interrupt), Err(Interrupted));
    }
}
