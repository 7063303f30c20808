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

//! The authoritative node and edge store and the committed snapshots over it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parity_scale_codec::Encode;

use oscoin_ledger_core::api::{
    GraphDataWriter, GraphReader, GraphWriter, Neighbor, Neighbors, Nodes,
};
use oscoin_ledger_core::graph::*;
use oscoin_ledger_core::{GraphError, StateVersion, H256};

use crate::store::{StateScan, StoreSnapshot};

/// Node and edge kinds an edge of the given kind may connect.
fn endpoint_kinds(kind: EdgeKind) -> (NodeKind, NodeKind) {
    match kind {
        EdgeKind::Dependency => (NodeKind::Project, NodeKind::Project),
        EdgeKind::Contribution | EdgeKind::Maintenance => {
            (NodeKind::Contributor, NodeKind::Project)
        }
    }
}

fn unlink(index: &mut BTreeMap<NodeId, BTreeSet<EdgeId>>, node: &NodeId, edge: &EdgeId) {
    let now_empty = match index.get_mut(node) {
        Some(edges) => {
            edges.remove(edge);
            edges.is_empty()
        }
        None => false,
    };
    if now_empty {
        index.remove(node);
    }
}

/// Nodes and edges of one graph version with adjacency indices in both directions.
///
/// All mutations check their preconditions before changing anything, so a failed call
/// leaves the graph untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphState {
    nodes: BTreeMap<NodeId, NodeData>,
    edges: BTreeMap<EdgeId, EdgeData>,
    outgoing: BTreeMap<NodeId, BTreeSet<EdgeId>>,
    incoming: BTreeMap<NodeId, BTreeSet<EdgeId>>,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&EdgeData> {
        self.edges.get(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edges.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn iter_nodes(
        &self,
        kind: Option<NodeKind>,
    ) -> impl Iterator<Item = (&NodeId, &NodeData)> + '_ {
        self.nodes
            .iter()
            .filter(move |(id, _)| kind.map_or(true, |kind| id.kind() == kind))
    }

    pub fn iter_edges(&self) -> impl Iterator<Item = (&EdgeId, &EdgeData)> + '_ {
        self.edges.iter()
    }

    /// Edges incident to `id`. Outgoing edges come before incoming edges when
    /// `direction` is [Direction::Both]. A self loop is reported once per direction.
    pub fn iter_neighbors<'a>(
        &'a self,
        id: &NodeId,
        direction: Direction,
        kind: Option<EdgeKind>,
    ) -> impl Iterator<Item = Neighbor<'a>> + 'a {
        let outgoing = match direction {
            Direction::Outgoing | Direction::Both => self.outgoing.get(id),
            Direction::Incoming => None,
        };
        let incoming = match direction {
            Direction::Incoming | Direction::Both => self.incoming.get(id),
            Direction::Outgoing => None,
        };
        let outgoing = outgoing
            .into_iter()
            .flatten()
            .map(move |edge| (edge, &edge.target));
        let incoming = incoming
            .into_iter()
            .flatten()
            .map(move |edge| (edge, &edge.source));
        outgoing
            .chain(incoming)
            .filter(move |(edge, _)| kind.map_or(true, |kind| edge.kind == kind))
            .filter_map(move |(edge, node)| {
                self.edges
                    .get(edge)
                    .map(|data| Neighbor { node, edge, data })
            })
    }

    /// Number of edges that have `id` as source or target.
    pub fn degree(&self, id: &NodeId) -> usize {
        let outgoing = self.outgoing.get(id).map_or(0, BTreeSet::len);
        let incoming = self.incoming.get(id).map_or(0, |edges| {
            edges.iter().filter(|edge| edge.source != *id).count()
        });
        outgoing + incoming
    }

    /// Hash over all nodes and edges in id order.
    pub fn content_hash(&self) -> H256 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"nodes");
        for entry in &self.nodes {
            hasher.update(&entry.encode());
        }
        hasher.update(b"edges");
        for entry in &self.edges {
            hasher.update(&entry.encode());
        }
        hasher.finalize().into()
    }
}

impl GraphWriter for GraphState {
    fn add_node(&mut self, id: NodeId, data: NodeData) -> Result<(), GraphError> {
        if data.kind() != id.kind() {
            return Err(GraphError::NodeKindMismatch {
                node: id,
                actual: data.kind(),
            });
        }
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.nodes.insert(id, data);
        Ok(())
    }

    fn remove_node(&mut self, id: &NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::NodeNotFound(id.clone()));
        }
        let edges = self.degree(id);
        if edges > 0 {
            return Err(GraphError::IncidentEdges {
                node: id.clone(),
                edges,
            });
        }
        self.nodes.remove(id);
        self.outgoing.remove(id);
        self.incoming.remove(id);
        Ok(())
    }

    fn add_edge(&mut self, id: EdgeId, data: EdgeData) -> Result<(), GraphError> {
        for endpoint in &[&id.source, &id.target] {
            if !self.nodes.contains_key(*endpoint) {
                return Err(GraphError::EndpointMissing((*endpoint).clone()));
            }
        }
        let (source_kind, target_kind) = endpoint_kinds(id.kind);
        if data.kind() != id.kind
            || id.source.kind() != source_kind
            || id.target.kind() != target_kind
        {
            return Err(GraphError::EdgeKindMismatch {
                actual: data.kind(),
                edge: id,
            });
        }
        if self.edges.contains_key(&id) {
            return Err(GraphError::DuplicateEdge(id));
        }
        self.outgoing
            .entry(id.source.clone())
            .or_default()
            .insert(id.clone());
        self.incoming
            .entry(id.target.clone())
            .or_default()
            .insert(id.clone());
        self.edges.insert(id, data);
        Ok(())
    }

    fn remove_edge(&mut self, id: &EdgeId) -> Result<(), GraphError> {
        if self.edges.remove(id).is_none() {
            return Err(GraphError::EdgeNotFound(id.clone()));
        }
        unlink(&mut self.outgoing, &id.source, id);
        unlink(&mut self.incoming, &id.target, id);
        Ok(())
    }
}

impl GraphDataWriter for GraphState {
    fn update_node_data(&mut self, id: &NodeId, data: NodeData) -> Result<(), GraphError> {
        match self.nodes.get_mut(id) {
            None => Err(GraphError::NodeNotFound(id.clone())),
            Some(_) if data.kind() != id.kind() => Err(GraphError::NodeKindMismatch {
                node: id.clone(),
                actual: data.kind(),
            }),
            Some(current) => {
                *current = data;
                Ok(())
            }
        }
    }

    fn update_edge_data(&mut self, id: &EdgeId, data: EdgeData) -> Result<(), GraphError> {
        match self.edges.get_mut(id) {
            None => Err(GraphError::EdgeNotFound(id.clone())),
            Some(_) if data.kind() != id.kind => Err(GraphError::EdgeKindMismatch {
                edge: id.clone(),
                actual: data.kind(),
            }),
            Some(current) => {
                *current = data;
                Ok(())
            }
        }
    }
}

/// An immutable committed version of the graph and the merkleized state.
///
/// Cloning is cheap. Commits publish new snapshots and never touch existing ones.
#[derive(Clone, Debug)]
pub struct Snapshot {
    version: StateVersion,
    graph: Arc<GraphState>,
    graph_hash: H256,
    state: StoreSnapshot,
}

impl Snapshot {
    pub(crate) fn new(
        version: StateVersion,
        graph: Arc<GraphState>,
        graph_hash: H256,
        state: StoreSnapshot,
    ) -> Self {
        Snapshot {
            version,
            graph,
            graph_hash,
            state,
        }
    }

    /// The empty genesis snapshot.
    pub fn genesis() -> Self {
        let graph = GraphState::new();
        let graph_hash = graph.content_hash();
        Self::new(
            StateVersion::default(),
            Arc::new(graph),
            graph_hash,
            StoreSnapshot::default(),
        )
    }

    pub fn graph(&self) -> &GraphState {
        &self.graph
    }

    /// The merkleized state committed with this graph version.
    pub fn state(&self) -> &StoreSnapshot {
        &self.state
    }

    pub fn root(&self) -> H256 {
        self.state.root()
    }
}

impl GraphReader for Snapshot {
    fn version(&self) -> StateVersion {
        self.version
    }

    fn content_hash(&self) -> H256 {
        self.graph_hash
    }

    fn get_node(&self, id: &NodeId) -> Option<&NodeData> {
        self.graph.node(id)
    }

    fn get_edge(&self, id: &EdgeId) -> Option<&EdgeData> {
        self.graph.edge(id)
    }

    fn nodes(&self, kind: Option<NodeKind>) -> Nodes<'_> {
        Nodes::new(self.graph.iter_nodes(kind))
    }

    fn neighbors(
        &self,
        id: &NodeId,
        direction: Direction,
        kind: Option<EdgeKind>,
    ) -> Neighbors<'_> {
        Neighbors::new(self.graph.iter_neighbors(id, direction, kind))
    }
}
