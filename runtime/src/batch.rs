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

//! Buffered mutations of one ledger transaction.

use std::collections::{BTreeMap, BTreeSet};

use parity_scale_codec::{Decode, Encode};

use oscoin_ledger_core::api::{GraphDataWriter, GraphReader, GraphWriter};
use oscoin_ledger_core::graph::{EdgeData, EdgeId, NodeData, NodeId};
use oscoin_ledger_core::keys::KeyRange;
use oscoin_ledger_core::{GraphError, StateVersion, TransactionError};

use crate::entity_graph::{GraphState, Snapshot};
use crate::store::{ChangeSet, StateScan};

/// Graph and state mutations staged on top of a [Snapshot].
///
/// Reads through a batch see its own writes. Nothing is visible to anyone else until
/// [crate::CheckpointManager::commit] applies the batch. Dropping a batch discards it.
pub struct Batch {
    base: Snapshot,
    graph: GraphState,
    changes: ChangeSet,
    touched_nodes: BTreeSet<NodeId>,
    touched_edges: BTreeSet<EdgeId>,
}

impl Batch {
    pub(crate) fn new(base: Snapshot) -> Self {
        Batch {
            graph: base.graph().clone(),
            base,
            changes: ChangeSet::new(),
            touched_nodes: BTreeSet::new(),
            touched_edges: BTreeSet::new(),
        }
    }

    /// Version of the snapshot the batch was opened on.
    pub fn base_version(&self) -> StateVersion {
        self.base.version()
    }

    /// The graph including the staged mutations.
    pub fn graph(&self) -> &GraphState {
        &self.graph
    }

    pub fn get_raw(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.changes.get(key) {
            Some(staged) => staged.map(<[u8]>::to_vec),
            None => self.base.state().get(key),
        }
    }

    pub fn get<T: Decode>(&self, key: &[u8]) -> Result<Option<T>, TransactionError> {
        self.get_raw(key)
            .map(|bytes| decode_entry(key, &bytes))
            .transpose()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.get_raw(key).is_some()
    }

    pub fn put(&mut self, key: Vec<u8>, value: &impl Encode) {
        self.changes.put(key, value.encode());
    }

    pub fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.changes.put(key, value);
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.changes.delete(key);
    }

    /// Committed entries in `range` merged with the staged changes, in key order.
    pub fn scan(&self, range: &KeyRange) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut entries = self
            .base
            .state()
            .scan(range)
            .into_iter()
            .collect::<BTreeMap<_, _>>();
        for (key, value) in self.changes.range(range) {
            match value {
                Some(value) => {
                    entries.insert(key.clone(), value.clone());
                }
                None => {
                    entries.remove(key);
                }
            }
        }
        entries.into_iter().collect()
    }

    pub fn scan_decoded<T: Decode>(
        &self,
        range: &KeyRange,
    ) -> Result<Vec<(Vec<u8>, T)>, TransactionError> {
        self.scan(range)
            .into_iter()
            .map(|(key, bytes)| {
                let value = decode_entry(&key, &bytes)?;
                Ok((key, value))
            })
            .collect()
    }

    pub(crate) fn into_parts(self) -> BatchParts {
        BatchParts {
            graph: self.graph,
            changes: self.changes,
            touched_nodes: self.touched_nodes,
            touched_edges: self.touched_edges,
        }
    }
}

pub(crate) struct BatchParts {
    pub graph: GraphState,
    pub changes: ChangeSet,
    pub touched_nodes: BTreeSet<NodeId>,
    pub touched_edges: BTreeSet<EdgeId>,
}

fn decode_entry<T: Decode>(key: &[u8], mut bytes: &[u8]) -> Result<T, TransactionError> {
    T::decode(&mut bytes).map_err(|_| TransactionError::CorruptState {
        key: String::from_utf8_lossy(key).into_owned(),
    })
}

impl GraphWriter for Batch {
    fn add_node(&mut self, id: NodeId, data: NodeData) -> Result<(), GraphError> {
        self.graph.add_node(id.clone(), data)?;
        self.touched_nodes.insert(id);
        Ok(())
    }

    fn remove_node(&mut self, id: &NodeId) -> Result<(), GraphError> {
        self.graph.remove_node(id)?;
        self.touched_nodes.insert(id.clone());
        Ok(())
    }

    fn add_edge(&mut self, id: EdgeId, data: EdgeData) -> Result<(), GraphError> {
        self.graph.add_edge(id.clone(), data)?;
        self.touched_edges.insert(id);
        Ok(())
    }

    fn remove_edge(&mut self, id: &EdgeId) -> Result<(), GraphError> {
        self.graph.remove_edge(id)?;
        self.touched_edges.insert(id.clone());
        Ok(())
    }
}

impl GraphDataWriter for Batch {
    fn update_node_data(&mut self, id: &NodeId, data: NodeData) -> Result<(), GraphError> {
        self.graph.update_node_data(id, data)?;
        self.touched_nodes.insert(id.clone());
        Ok(())
    }

    fn update_edge_data(&mut self, id: &EdgeId, data: EdgeData) -> Result<(), GraphError> {
        self.graph.update_edge_data(id, data)?;
        self.touched_edges.insert(id.clone());
        Ok(())
    }
}
