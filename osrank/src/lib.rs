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

//! Osrank, the reference ranking algorithm of the Oscoin ledger.
//!
//! Ranks are estimated with Monte Carlo random walks. [HyperParameters::walks_per_node]
//! walks start from every node of the graph. A walk continues with the damping factor of
//! its current node and follows an edge chosen by the [EdgeWeights]. The rank of a node is
//! its share of all visits.
//!
//! The computation runs in two phases. The first phase walks the whole graph. Nodes whose
//! rank is below [HyperParameters::pruning_threshold] are removed and the second phase walks
//! the remaining graph. Pruned projects get a rank of zero.
//!
//! The random number generator is seeded from [ExecutionEnv::seed], so every ledger node
//! computes the same ranks. The context caches the last ranks together with the hash of the
//! walk graph and of the parameters.

use std::convert::TryFrom;

use parity_scale_codec::{Decode, Encode};
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use oscoin_ledger_core::api::{
    ExecutionEnv, GraphAlgorithm, GraphAnnotator, GraphReader, OsrankField,
};
use oscoin_ledger_core::graph::{NodeKind, Osrank};
use oscoin_ledger_core::{AlgorithmId, Context, GraphError, Id, InvalidIdError, ProjectId, H256};

pub mod params;
mod walk;

pub use params::{EdgeWeights, HyperParameters, InvalidParameter};
use walk::WalkGraph;

/// Default id under which contexts and outputs of the algorithm are stored.
pub const ALGORITHM_ID: &str = "osrank";

/// Ranks of all projects ordered by project id.
pub type Ranks = Vec<(ProjectId, Osrank)>;

/// Cache threaded through executions as the [Context].
#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct RankCache {
    pub graph_hash: H256,
    pub params_hash: H256,
    pub ranks: Ranks,
}

#[derive(Debug, thiserror::Error)]
pub enum OsrankError {
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameter),

    #[error("invalid algorithm id: {0}")]
    InvalidId(#[from] InvalidIdError),

    #[error("ranking was interrupted")]
    Interrupted,

    #[error("failed to annotate rank: {0}")]
    Annotation(#[from] GraphError),
}

impl From<walk::Interrupted> for OsrankError {
    fn from(_: walk::Interrupted) -> Self {
        OsrankError::Interrupted
    }
}

pub struct OsrankAlgorithm {
    id: AlgorithmId,
    params: HyperParameters,
}

impl OsrankAlgorithm {
    /// Osrank with the given parameters stored under [ALGORITHM_ID].
    pub fn new(params: HyperParameters) -> Result<Self, OsrankError> {
        Self::with_id(Id::try_from(ALGORITHM_ID)?, params)
    }

    pub fn with_id(id: AlgorithmId, params: HyperParameters) -> Result<Self, OsrankError> {
        params.validate()?;
        Ok(OsrankAlgorithm { id, params })
    }

    pub fn params(&self) -> &HyperParameters {
        &self.params
    }

    fn rank(&self, graph: &WalkGraph, env: &ExecutionEnv) -> Result<Vec<f64>, OsrankError> {
        let mut rng = ChaChaRng::from_seed(env.seed);
        let walks = self.params.walks_per_node;
        let first = graph.walk(walks, &mut rng, &env.interrupt)?;

        let keep = first
            .iter()
            .map(|rank| *rank >= self.params.pruning_threshold)
            .collect::<Vec<_>>();
        let pruned_count = keep.iter().filter(|kept| !**kept).count();
        if pruned_count == 0 {
            return Ok(first);
        }
        log::debug!("pruned {} of {} nodes", pruned_count, graph.len());

        let pruned = graph.retain(&keep);
        let second = pruned.walk(walks, &mut rng, &env.interrupt)?;
        let mut second = second.into_iter();
        Ok(keep
            .iter()
            .map(|kept| if *kept { second.next().unwrap_or(0.0) } else { 0.0 })
            .collect())
    }

    /// Ranks of the projects in `graph`. Nodes are in id order, so the ranks are too.
    fn project_ranks(&self, graph: &WalkGraph, env: &ExecutionEnv) -> Result<Ranks, OsrankError> {
        let ranks = self.rank(graph, env)?;
        Ok((0..graph.len())
            .map(|position| graph.node_id(position))
            .zip(ranks)
            .filter(|(id, _)| id.kind() == NodeKind::Project)
            .map(|(id, rank)| (id.id().clone(), Osrank::from_f64(rank)))
            .collect())
    }

    fn cached(&self, context: &Context) -> Option<RankCache> {
        if context.is_empty() {
            return None;
        }
        match context.decode_into::<RankCache>() {
            Ok(cache) => Some(cache),
            Err(error) => {
                log::warn!("ignoring undecodable osrank context: {}", error);
                None
            }
        }
    }
}

impl GraphAlgorithm for OsrankAlgorithm {
    type Field = OsrankField;
    type Output = Ranks;
    type Error = OsrankError;

    fn id(&self) -> AlgorithmId {
        self.id.clone()
    }

    fn default_context(&self) -> Context {
        Context::empty()
    }

    fn execute(
        &self,
        context: &Context,
        reader: &dyn GraphReader,
        annotator: &mut dyn GraphAnnotator<OsrankField>,
        env: &ExecutionEnv,
    ) -> Result<(Context, Option<Ranks>), OsrankError> {
        let graph = WalkGraph::new(reader, &self.params);
        let graph_hash = graph.hash();
        let params_hash = self.params.hash();

        let ranks = match self.cached(context) {
            Some(cache) if cache.graph_hash == graph_hash && cache.params_hash == params_hash => {
                log::debug!("graph unchanged, reusing {} cached ranks", cache.ranks.len());
                cache.ranks
            }
            _ => self.project_ranks(&graph, env)?,
        };

        for (project_id, rank) in &ranks {
            annotator.write_annotation(project_id, *rank)?;
        }

        let context = Context::encode_from(&RankCache {
            graph_hash,
            params_hash,
            ranks: ranks.clone(),
        });
        Ok((context, Some(ranks)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use oscoin_ledger_core::api::{GraphWriter, Interrupt};
    use oscoin_ledger_core::graph::*;
    use oscoin_ledger_runtime::runner::Annotations;
    use oscoin_ledger_runtime::{CheckpointManager, RuntimeConfig, Snapshot};

    fn id(s: &str) -> Id {
        Id::try_from(s).unwrap()
    }

    fn env(seed: u8) -> ExecutionEnv {
        ExecutionEnv {
            seed: [seed; 32],
            interrupt: Interrupt::new(),
        }
    }

    /// `a` depends on `b`, `alice` maintains `a` and contributes to `b`. `c` is isolated.
    fn snapshot() -> Snapshot {
        let mut manager = CheckpointManager::new(&RuntimeConfig::default());
        let mut batch = manager.begin();
        for project in &["a", "b", "c"] {
            batch
                .add_node(
                    NodeId::Project(id(project)),
                    NodeData::Project(ProjectData {
                        osrank: Osrank::default(),
                        contract: ContractType::Standard,
                        account: id(project),
                    }),
                )
                .unwrap();
        }
        batch
            .add_node(
                NodeId::Contributor(id("alice")),
                NodeData::Contributor(ContributorData::default()),
            )
            .unwrap();
        batch
            .add_edge(
                EdgeId::dependency(id("a"), id("b")),
                EdgeData::Dependency {
                    checkpoint: H256::zero(),
                },
            )
            .unwrap();
        batch
            .add_edge(EdgeId::maintenance(id("alice"), id("a")), EdgeData::Maintenance)
            .unwrap();
        batch
            .add_edge(
                EdgeId::contribution(id("alice"), id("b")),
                EdgeData::Contribution {
                    index: 0,
                    count: 3,
                    key: oscoin_ledger_core::Fingerprint([1; 20]),
                    verified: false,
                },
            )
            .unwrap();
        manager.commit(batch, None).unwrap();
        manager.snapshot()
    }

    fn run(
        algorithm: &OsrankAlgorithm,
        snapshot: &Snapshot,
        context: &Context,
        env: &ExecutionEnv,
    ) -> (Context, Ranks, usize) {
        let mut annotations = Annotations::<OsrankField>::new(snapshot);
        let (context, ranks) = algorithm
            .execute(context, snapshot, &mut annotations, env)
            .unwrap();
        (context, ranks.unwrap(), annotations.into_values().len())
    }

    fn rank_of(ranks: &Ranks, project: &str) -> Osrank {
        ranks
            .iter()
            .find(|(id, _)| id.as_str() == project)
            .map(|(_, rank)| *rank)
            .unwrap()
    }

    #[test]
    fn deterministic_for_the_same_seed() {
        let algorithm = OsrankAlgorithm::new(HyperParameters::default()).unwrap();
        let snapshot = snapshot();
        let (first_context, first, annotated) =
            run(&algorithm, &snapshot, &Context::empty(), &env(7));
        let (second_context, second, _) = run(&algorithm, &snapshot, &Context::empty(), &env(7));
        assert_eq!(first, second);
        assert_eq!(first_context, second_context);
        assert_eq!(annotated, 3);
        assert_eq!(
            first.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn dependencies_and_contributions_raise_ranks() {
        let algorithm = OsrankAlgorithm::new(HyperParameters::default()).unwrap();
        let (_, ranks, _) = run(&algorithm, &snapshot(), &Context::empty(), &env(1));
        assert!(rank_of(&ranks, "b") > rank_of(&ranks, "c"));
        assert!(rank_of(&ranks, "c") > Osrank::default());
    }

    #[test]
    fn cached_ranks_are_reused() {
        let algorithm = OsrankAlgorithm::new(HyperParameters::default()).unwrap();
        let snapshot = snapshot();
        let (context, first, _) = run(&algorithm, &snapshot, &Context::empty(), &env(1));
        let cache = context.decode_into::<RankCache>().unwrap();
        assert_eq!(cache.ranks, first);

        // A different seed would give different ranks without the cache.
        let (_, second, _) = run(&algorithm, &snapshot, &context, &env(2));
        assert_eq!(first, second);

        let other = OsrankAlgorithm::new(HyperParameters {
            walks_per_node: 11,
            ..HyperParameters::default()
        })
        .unwrap();
        let (recomputed, _, _) = run(&other, &snapshot, &context, &env(2));
        assert_ne!(
            recomputed.decode_into::<RankCache>().unwrap().params_hash,
            cache.params_hash
        );
    }

    #[test]
    fn undecodable_context_is_recomputed() {
        let algorithm = OsrankAlgorithm::new(HyperParameters::default()).unwrap();
        let snapshot = snapshot();
        let (_, fresh, _) = run(&algorithm, &snapshot, &Context::empty(), &env(3));
        let (_, ranks, _) = run(&algorithm, &snapshot, &Context(vec![0xff]), &env(3));
        assert_eq!(fresh, ranks);
    }

    #[test]
    fn pruned_projects_rank_zero() {
        let algorithm = OsrankAlgorithm::new(HyperParameters {
            pruning_threshold: 1.0,
            ..HyperParameters::default()
        })
        .unwrap();
        let (_, ranks, annotated) = run(&algorithm, &snapshot(), &Context::empty(), &env(1));
        assert!(ranks.iter().all(|(_, rank)| *rank == Osrank::default()));
        assert_eq!(annotated, 3);
    }

    #[test]
    fn interrupted_runs_fail() {
        let algorithm = OsrankAlgorithm::new(HyperParameters::default()).unwrap();
        let snapshot = snapshot();
        let env = env(1);
        env.interrupt.cancel();
        let mut annotations = Annotations::<OsrankField>::new(&snapshot);
        let result = algorithm.execute(&Context::empty(), &snapshot, &mut annotations, &env);
        assert!(matches!(result, Err(OsrankError::Interrupted)));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let result = OsrankAlgorithm::new(HyperParameters {
            walks_per_node: 0,
            ..HyperParameters::default()
        });
        assert!(matches!(result, Err(OsrankError::InvalidParameter(_))));
    }
}
