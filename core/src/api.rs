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

//! Capabilities handed out over the ledger graph.
//!
//! Access to the graph is split by trust level:
//!
//! * [GraphWriter] adds and removes nodes and edges. Only the ledger holds it.
//! * [GraphDataWriter] replaces node and edge payloads without changing the structure.
//! * [GraphAnnotator] writes a single [AnnotatedField] on nodes of one kind. It is the only
//!   write capability a [GraphAlgorithm] receives.
//! * [GraphReader] traverses one immutable committed snapshot.
//!
//! All traits are object safe. Algorithms receive `&dyn GraphReader` and
//! `&mut dyn GraphAnnotator<_>` so that the algorithm and the ledger only share this module.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parity_scale_codec::Encode;

use crate::error::GraphError;
use crate::graph::*;
use crate::{AlgorithmId, Context, Id, StateVersion, H256};

/// Lazy sequence of nodes returned by [GraphReader::nodes].
pub struct Nodes<'a>(Box<dyn Iterator<Item = (&'a NodeId, &'a NodeData)> + 'a>);

impl<'a> Nodes<'a> {
    pub fn new(iter: impl Iterator<Item = (&'a NodeId, &'a NodeData)> + 'a) -> Self {
        Nodes(Box::new(iter))
    }
}

impl<'a> Iterator for Nodes<'a> {
    type Item = (&'a NodeId, &'a NodeData);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

/// An edge seen from one of its endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Neighbor<'a> {
    /// The endpoint of `edge` that is not the node the traversal started from.
    pub node: &'a NodeId,
    pub edge: &'a EdgeId,
    pub data: &'a EdgeData,
}

/// Lazy sequence of neighbors returned by [GraphReader::neighbors].
pub struct Neighbors<'a>(Box<dyn Iterator<Item = Neighbor<'a>> + 'a>);

impl<'a> Neighbors<'a> {
    pub fn new(iter: impl Iterator<Item = Neighbor<'a>> + 'a) -> Self {
        Neighbors(Box::new(iter))
    }

    pub fn empty() -> Self {
        Neighbors(Box::new(std::iter::empty()))
    }
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = Neighbor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

/// Read-only view of one committed graph version.
///
/// Every iterator is finite and calling a method again restarts the traversal. Writers
/// committing new versions never change what an existing reader returns.
pub trait GraphReader {
    /// State version the reader is bound to.
    fn version(&self) -> StateVersion;

    /// Content hash of the graph at [GraphReader::version].
    fn content_hash(&self) -> H256;

    fn get_node(&self, id: &NodeId) -> Option<&NodeData>;

    fn get_edge(&self, id: &EdgeId) -> Option<&EdgeData>;

    /// All nodes ordered by id, optionally restricted to one kind.
    fn nodes(&self, kind: Option<NodeKind>) -> Nodes<'_>;

    /// Edges incident to `id` in the given direction, ordered by edge id.
    ///
    /// Yields nothing if the node does not exist.
    fn neighbors(&self, id: &NodeId, direction: Direction, kind: Option<EdgeKind>)
        -> Neighbors<'_>;
}

/// Structural mutation of the graph.
pub trait GraphWriter {
    /// Fails with [GraphError::DuplicateNode] if the node exists.
    fn add_node(&mut self, id: NodeId, data: NodeData) -> Result<(), GraphError>;

    /// Fails with [GraphError::NodeNotFound] if the node is absent and with
    /// [GraphError::IncidentEdges] if any edge still references it. Edges are never removed
    /// implicitly.
    fn remove_node(&mut self, id: &NodeId) -> Result<(), GraphError>;

    /// Fails with [GraphError::EndpointMissing] if an endpoint is absent and with
    /// [GraphError::DuplicateEdge] if the `(source, target, kind)` triple exists.
    fn add_edge(&mut self, id: EdgeId, data: EdgeData) -> Result<(), GraphError>;

    fn remove_edge(&mut self, id: &EdgeId) -> Result<(), GraphError>;
}

/// Payload mutation of existing nodes and edges.
pub trait GraphDataWriter {
    fn update_node_data(&mut self, id: &NodeId, data: NodeData) -> Result<(), GraphError>;

    fn update_edge_data(&mut self, id: &EdgeId, data: EdgeData) -> Result<(), GraphError>;
}

/// A single field on nodes of kind [AnnotatedField::KIND] that an algorithm may write.
pub trait AnnotatedField: 'static {
    const KIND: NodeKind;

    type Value: Clone + std::fmt::Debug;

    /// Write `value` into the field. Returns `false` if `data` is not of [AnnotatedField::KIND].
    fn annotate(data: &mut NodeData, value: Self::Value) -> bool;
}

/// The osrank score of project nodes.
#[derive(Clone, Copy, Debug)]
pub struct OsrankField;

impl AnnotatedField for OsrankField {
    const KIND: NodeKind = NodeKind::Project;

    type Value = Osrank;

    fn annotate(data: &mut NodeData, value: Osrank) -> bool {
        match data {
            NodeData::Project(project) => {
                project.osrank = value;
                true
            }
            NodeData::Contributor(_) => false,
        }
    }
}

/// Write-only access to the field `F`.
pub trait GraphAnnotator<F: AnnotatedField> {
    /// Fails with [GraphError::NodeNotFound] if no node of kind `F::KIND` with this id exists.
    fn write_annotation(&mut self, id: &Id, value: F::Value) -> Result<(), GraphError>;
}

/// Host provided cancellation handle.
///
/// Clones share the cancel flag. Algorithms are expected to poll
/// [Interrupt::is_interrupted] and return early when it is set.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Interrupt {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// A handle sharing the cancel flag of `self` that also expires at `deadline`.
    pub fn until(&self, deadline: Instant) -> Self {
        Interrupt {
            cancelled: self.cancelled.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once [Interrupt::cancel] was called or the deadline passed.
    pub fn is_interrupted(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self
                .deadline
                .map_or(false, |deadline| Instant::now() >= deadline)
    }
}

/// Environment of one algorithm execution.
#[derive(Clone, Debug)]
pub struct ExecutionEnv {
    /// Deterministic seed. Executions against the same snapshot get the same seed.
    pub seed: [u8; 32],
    pub interrupt: Interrupt,
}

/// An incremental graph algorithm.
///
/// Given the same context and the same snapshot, `execute` must return the same result on
/// every ledger node. Randomness is only allowed through [ExecutionEnv::seed].
pub trait GraphAlgorithm {
    /// The node field the algorithm writes.
    type Field: AnnotatedField;

    /// Result published into the ledger state.
    type Output: Encode;

    type Error: std::error::Error;

    fn id(&self) -> AlgorithmId;

    /// Context used when no context was stored yet.
    fn default_context(&self) -> Context;

    fn execute(
        &self,
        context: &Context,
        reader: &dyn GraphReader,
        annotator: &mut dyn GraphAnnotator<Self::Field>,
        env: &ExecutionEnv,
    ) -> Result<(Context, Option<Self::Output>), Self::Error>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn osrank_field_only_annotates_projects() {
        let mut project = NodeData::Project(ProjectData {
            osrank: Osrank(0),
            contract: ContractType::Standard,
            account: "acc".parse::<Id>().unwrap(),
        });
        assert!(OsrankField::annotate(&mut project, Osrank(7)));
        match project {
            NodeData::Project(data) => {
                assert_eq!(data.osrank, Osrank(7));
                assert_eq!(data.contract, ContractType::Standard);
            }
            NodeData::Contributor(_) => panic!("kind changed"),
        }

        let mut contributor = NodeData::Contributor(ContributorData::default());
        assert!(!OsrankField::annotate(&mut contributor, Osrank(7)));
        assert_eq!(
            contributor,
            NodeData::Contributor(ContributorData::default())
        );
    }

    #[test]
    fn interrupt_is_shared_between_clones() {
        let interrupt = Interrupt::new();
        let clone = interrupt.clone();
        assert!(!interrupt.is_interrupted());
        clone.cancel();
        assert!(interrupt.is_interrupted());
    }

    #[test]
    fn interrupt_deadline() {
        let interrupt = Interrupt::with_deadline(Instant::now());
        assert!(interrupt.is_interrupted());
        let interrupt = Interrupt::with_timeout(Duration::from_secs(3600));
        assert!(!interrupt.is_interrupted());

        let expiring = interrupt.until(Instant::now());
        assert!(expiring.is_interrupted());
        assert!(!interrupt.is_interrupted());
    }
}
