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

//! Atomic commits of batches and the history of committed snapshots.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parity_scale_codec::Encode;

use oscoin_ledger_core::api::{AnnotatedField, GraphDataWriter, GraphReader};
use oscoin_ledger_core::graph::NodeId;
use oscoin_ledger_core::state::Checkpoint;
use oscoin_ledger_core::{keys, AlgorithmId, Id, ProjectId, StateVersion, TransactionError, H256};

use crate::batch::Batch;
use crate::config::RuntimeConfig;
use crate::entity_graph::Snapshot;
use crate::store::MemoryStore;

/// The project whose checkpoint sequence a commit extends.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckpointTarget {
    pub project_id: ProjectId,
    /// Hash of the project's off-chain data, if the transaction supplied one.
    pub project_hash: Option<H256>,
}

impl CheckpointTarget {
    pub fn new(project_id: ProjectId) -> Self {
        CheckpointTarget {
            project_id,
            project_hash: None,
        }
    }
}

/// Result of a successful commit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Committed {
    pub version: StateVersion,
    /// Merkle root of the state after the commit.
    pub root: H256,
    pub graph_hash: H256,
    /// Checkpoint created for the [CheckpointTarget], if one was given.
    pub checkpoint: Option<Checkpoint>,
}

impl Committed {
    pub fn checkpoint_id(&self) -> Option<H256> {
        self.checkpoint.as_ref().map(Checkpoint::id)
    }
}

/// Applies batches to the merkleized state and publishes the resulting snapshots.
///
/// There is a single writer. Snapshots handed out before a commit keep returning the state
/// they were created with.
pub struct CheckpointManager {
    store: MemoryStore,
    head: Snapshot,
    history: VecDeque<Snapshot>,
    retention: usize,
}

impl CheckpointManager {
    pub fn new(config: &RuntimeConfig) -> Self {
        CheckpointManager {
            store: MemoryStore::new(),
            head: Snapshot::genesis(),
            history: VecDeque::new(),
            retention: config.snapshot_retention,
        }
    }

    /// Open a batch on the current head.
    pub fn begin(&self) -> Batch {
        Batch::new(self.head.clone())
    }

    /// The current head snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.head.clone()
    }

    /// A retained snapshot of the given version.
    pub fn snapshot_at(&self, version: StateVersion) -> Option<Snapshot> {
        if self.head.version() == version {
            return Some(self.head.clone());
        }
        self.history
            .iter()
            .find(|snapshot| snapshot.version() == version)
            .cloned()
    }

    /// Apply all mutations of `batch` in one change set and publish the new head.
    ///
    /// With a `target` the commit also records the next checkpoint of that project. The
    /// batch must have been opened on the current head.
    pub fn commit(
        &mut self,
        batch: Batch,
        target: Option<CheckpointTarget>,
    ) -> Result<Committed, TransactionError> {
        let head_version = self.head.version();
        if batch.base_version() != head_version {
            return Err(TransactionError::StaleBatch {
                opened: batch.base_version(),
                head: head_version,
            });
        }

        let checkpoint = match target {
            Some(target) => Some(next_checkpoint(&batch, target)?),
            None => None,
        };

        let mut parts = batch.into_parts();
        let graph_hash = parts.graph.content_hash();

        for node in &parts.touched_nodes {
            let key = keys::graph_node(node);
            match parts.graph.node(node) {
                Some(data) => parts.changes.put(key, data.encode()),
                None => parts.changes.delete(key),
            }
        }
        for edge in &parts.touched_edges {
            let key = keys::graph_edge(edge);
            match parts.graph.edge(edge) {
                Some(data) => parts.changes.put(key, data.encode()),
                None => parts.changes.delete(key),
            }
        }

        let checkpoint = checkpoint.map(|checkpoint| Checkpoint {
            graph_hash,
            ..checkpoint
        });
        if let Some(checkpoint) = &checkpoint {
            let id = checkpoint.id();
            let encoded_id = id.encode();
            parts.changes.put(keys::checkpoint(&id), checkpoint.encode());
            parts.changes.put(
                keys::project_checkpoint(&checkpoint.project_id, checkpoint.index),
                encoded_id.clone(),
            );
            parts
                .changes
                .put(keys::project_checkpoint_latest(&checkpoint.project_id), encoded_id);
        }

        let version = head_version.next();
        let changed = parts.changes.len();
        let root = self.store.commit(parts.changes);
        let head = Snapshot::new(
            version,
            Arc::new(parts.graph),
            graph_hash,
            self.store.snapshot(),
        );
        let previous = std::mem::replace(&mut self.head, head);
        self.history.push_back(previous);
        while self.history.len() > self.retention {
            self.history.pop_front();
        }

        log::debug!(
            "committed {} with {} changed keys, root {}",
            version,
            changed,
            root
        );

        Ok(Committed {
            version,
            root,
            graph_hash,
            checkpoint,
        })
    }

    /// Commit the result of an algorithm execution against snapshot `version`.
    ///
    /// Annotations of nodes that were removed since the execution are skipped. The output is
    /// stored under `algorithms/:id/outputs/:version` and `algorithms/:id/outputs/latest`.
    ///
    /// Fails with [TransactionError::StaleExecution] if an execution of the same algorithm
    /// against a newer snapshot was already committed.
    pub fn commit_execution<F: AnnotatedField>(
        &mut self,
        algorithm: &AlgorithmId,
        version: StateVersion,
        annotations: &BTreeMap<Id, F::Value>,
        output: Option<Vec<u8>>,
    ) -> Result<Committed, TransactionError> {
        let mut batch = self.begin();
        let executed_key = keys::algorithm_executed(algorithm);
        if let Some(committed) = batch.get::<StateVersion>(&executed_key)? {
            if version < committed {
                return Err(TransactionError::StaleExecution {
                    executed: version,
                    committed,
                });
            }
        }
        batch.put(executed_key, &version);
        for (id, value) in annotations {
            let node = NodeId::new(F::KIND, id.clone());
            let mut data = match batch.graph().node(&node) {
                Some(data) => data.clone(),
                None => {
                    log::warn!("skipping annotation of removed node {}", node);
                    continue;
                }
            };
            if F::annotate(&mut data, value.clone()) {
                batch.update_node_data(&node, data)?;
            }
        }
        if let Some(output) = output {
            batch.put_raw(keys::algorithm_output(algorithm, version), output.clone());
            batch.put_raw(keys::algorithm_output_latest(algorithm), output);
        }
        self.commit(batch, None)
    }
}

fn next_checkpoint(batch: &Batch, target: CheckpointTarget) -> Result<Checkpoint, TransactionError> {
    let latest_key = keys::project_checkpoint_latest(&target.project_id);
    let parent_id = batch.get::<H256>(&latest_key)?;
    let parent = match &parent_id {
        Some(id) => batch.get::<Checkpoint>(&keys::checkpoint(id))?,
        None => None,
    };
    let parent_index = parent.map(|parent| parent.index);
    Ok(Checkpoint {
        project_id: target.project_id,
        index: parent_index.map_or(0, |index| index + 1),
        parent_index,
        parent: parent_id,
        graph_hash: H256::zero(),
        project_hash: target.project_hash,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::StateScan;
    use oscoin_ledger_core::api::GraphWriter;
    use oscoin_ledger_core::graph::*;
    use oscoin_ledger_core::ErrorKind;
    use parity_scale_codec::Decode;
    use std::convert::TryFrom;

    fn id(s: &str) -> Id {
        Id::try_from(s).unwrap()
    }

    fn project_data(account: &str) -> NodeData {
        NodeData::Project(ProjectData {
            osrank: Osrank::default(),
            contract: ContractType::Standard,
            account: id(account),
        })
    }

    fn manager() -> CheckpointManager {
        CheckpointManager::new(&RuntimeConfig::default())
    }

    #[test]
    fn checkpoint_indices_increase_per_project() {
        let mut manager = manager();
        let p = id("p");
        let q = id("q");

        let mut batch = manager.begin();
        batch
            .add_node(NodeId::Project(p.clone()), project_data("p"))
            .unwrap();
        let first = manager
            .commit(batch, Some(CheckpointTarget::new(p.clone())))
            .unwrap()
            .checkpoint
            .unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.parent, None);

        let other = manager
            .commit(manager.begin(), Some(CheckpointTarget::new(q.clone())))
            .unwrap()
            .checkpoint
            .unwrap();
        assert_eq!(other.index, 0);

        let second = manager
            .commit(manager.begin(), Some(CheckpointTarget::new(p.clone())))
            .unwrap()
            .checkpoint
            .unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.parent_index, Some(0));
        assert_eq!(second.parent, Some(first.id()));

        let state = manager.snapshot();
        let latest = state.state().get(&keys::project_checkpoint_latest(&p)).unwrap();
        assert_eq!(
            H256::decode(&mut &latest[..]).unwrap(),
            second.id()
        );
        assert!(state.state().get(&keys::checkpoint(&first.id())).is_some());
    }

    #[test]
    fn snapshots_are_stable() {
        let mut manager = manager();
        let p = NodeId::Project(id("p"));
        let before = manager.snapshot();
        let root_before = before.root();

        let mut batch = manager.begin();
        batch.add_node(p.clone(), project_data("p")).unwrap();
        manager.commit(batch, None).unwrap();

        assert!(before.get_node(&p).is_none());
        assert_eq!(before.root(), root_before);
        assert_eq!(before.version(), StateVersion(0));
        let after = manager.snapshot();
        assert!(after.get_node(&p).is_some());
        assert_ne!(after.content_hash(), before.content_hash());
        assert!(after.state().get(&keys::graph_node(&p)).is_some());
    }

    #[test]
    fn failed_batches_leave_no_trace() {
        let mut manager = manager();
        let before = manager.snapshot();

        let mut batch = manager.begin();
        batch
            .add_node(NodeId::Project(id("p")), project_data("p"))
            .unwrap();
        let error = batch
            .add_edge(
                EdgeId::dependency(id("p"), id("missing")),
                EdgeData::Dependency {
                    checkpoint: H256::zero(),
                },
            )
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::StructuralViolation);
        drop(batch);

        let after = manager.snapshot();
        assert_eq!(after.version(), before.version());
        assert_eq!(after.root(), before.root());
        assert_eq!(after.nodes(None).count(), 0);
    }

    #[test]
    fn stale_batches_are_rejected() {
        let mut manager = manager();
        let stale = manager.begin();
        manager.commit(manager.begin(), None).unwrap();
        assert!(matches!(
            manager.commit(stale, None),
            Err(TransactionError::StaleBatch { .. })
        ));
    }

    #[test]
    fn snapshot_retention() {
        let mut manager = CheckpointManager::new(&RuntimeConfig {
            snapshot_retention: 2,
            ..RuntimeConfig::default()
        });
        for _ in 0..4 {
            manager.commit(manager.begin(), None).unwrap();
        }
        assert!(manager.snapshot_at(StateVersion(4)).is_some());
        assert!(manager.snapshot_at(StateVersion(3)).is_some());
        assert!(manager.snapshot_at(StateVersion(2)).is_some());
        assert!(manager.snapshot_at(StateVersion(1)).is_none());
    }

    #[test]
    fn execution_skips_removed_nodes() {
        let mut manager = manager();
        let p = id("p");
        let mut batch = manager.begin();
        batch
            .add_node(NodeId::Project(p.clone()), project_data("p"))
            .unwrap();
        manager.commit(batch, None).unwrap();

        let mut annotations = BTreeMap::new();
        annotations.insert(p.clone(), Osrank(5));
        annotations.insert(id("gone"), Osrank(6));
        let algorithm = id("osrank");
        let committed = manager
            .commit_execution::<oscoin_ledger_core::api::OsrankField>(
                &algorithm,
                StateVersion(1),
                &annotations,
                Some(vec![1, 2, 3]),
            )
            .unwrap();
        assert_eq!(committed.version, StateVersion(2));

        let snapshot = manager.snapshot();
        match snapshot.get_node(&NodeId::Project(p)) {
            Some(NodeData::Project(data)) => assert_eq!(data.osrank, Osrank(5)),
            other => panic!("unexpected node {:?}", other),
        }
        assert!(snapshot
            .get_node(&NodeId::Project(id("gone")))
            .is_none());
        assert_eq!(
            snapshot
                .state()
                .get(&keys::algorithm_output(&algorithm, StateVersion(1))),
            Some(vec![1, 2, 3])
        );
    }

    #[test]
    fn older_executions_are_rejected() {
        let mut manager = manager();
        let p = id("p");
        let mut batch = manager.begin();
        batch
            .add_node(NodeId::Project(p.clone()), project_data("p"))
            .unwrap();
        let older = manager.commit(batch, None).unwrap().version;
        let newer = manager.commit(manager.begin(), None).unwrap().version;

        let algorithm = id("osrank");
        let mut annotations = BTreeMap::new();
        annotations.insert(p.clone(), Osrank(2));
        manager
            .commit_execution::<oscoin_ledger_core::api::OsrankField>(
                &algorithm,
                newer,
                &annotations,
                Some(vec![2]),
            )
            .unwrap();
        let head = manager.snapshot();

        annotations.insert(p.clone(), Osrank(1));
        let error = manager
            .commit_execution::<oscoin_ledger_core::api::OsrankField>(
                &algorithm,
                older,
                &annotations,
                Some(vec![1]),
            )
            .unwrap_err();
        assert_eq!(
            error,
            TransactionError::StaleExecution {
                executed: older,
                committed: newer,
            }
        );
        assert_eq!(error.kind(), ErrorKind::Conflict);

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.version(), head.version());
        assert_eq!(snapshot.root(), head.root());
        assert_eq!(
            snapshot
                .state()
                .get(&keys::algorithm_output_latest(&algorithm)),
            Some(vec![2])
        );
        match snapshot.get_node(&NodeId::Project(p)) {
            Some(NodeData::Project(data)) => assert_eq!(data.osrank, Osrank(2)),
            other => panic!("unexpected node {:?}", other),
        }

        manager
            .commit_execution::<oscoin_ledger_core::api::OsrankField>(
                &id("other"),
                older,
                &BTreeMap::new(),
                None,
            )
            .unwrap();
    }
}
