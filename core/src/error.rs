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

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::graph::{EdgeId, EdgeKind, NodeId, NodeKind};
use crate::StateVersion;

/// Classification shared by all errors of the ledger graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Node, edge, checkpoint or name absent.
    NotFound,
    /// Duplicate node or edge on creation.
    Conflict,
    /// Missing edge endpoint, node removal with remaining edges or mismatching kinds.
    StructuralViolation,
    /// Reverse lookup query.
    Unsupported,
    /// Algorithm execution interrupted by its host.
    Cancelled,
    /// Algorithm execution failed.
    Aborted,
}

/// Errors returned by the graph capabilities.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("edge {0} does not exist")]
    EdgeNotFound(EdgeId),

    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("edge {0} already exists")]
    DuplicateEdge(EdgeId),

    #[error("edge endpoint {0} does not exist")]
    EndpointMissing(NodeId),

    #[error("node {node} still has {edges} incident edges")]
    IncidentEdges { node: NodeId, edges: usize },

    #[error("node {node} cannot carry {actual:?} data")]
    NodeKindMismatch { node: NodeId, actual: NodeKind },

    #[error("edge {edge} cannot carry {actual:?} data")]
    EdgeKindMismatch { edge: EdgeId, actual: EdgeKind },
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::NodeNotFound(_) | GraphError::EdgeNotFound(_) => ErrorKind::NotFound,
            GraphError::DuplicateNode(_) | GraphError::DuplicateEdge(_) => ErrorKind::Conflict,
            GraphError::EndpointMissing(_)
            | GraphError::IncidentEdges { .. }
            | GraphError::NodeKindMismatch { .. }
            | GraphError::EdgeKindMismatch { .. } => ErrorKind::StructuralViolation,
        }
    }
}

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Encode, Decode, Serialize, Deserialize, thiserror::Error,
)]
#[error("{}", <&'static str>::from(*self))]
/// Errors describing failed ledger transactions that are not graph errors.
pub enum RegistryError {
    InexistentProjectId = 0,
    DuplicateProjectId,
    InsufficientSenderPermissions,
    DuplicateMaintainer,
    InexistentMaintainer,
    LastMaintainer,
    DuplicateName,
    DuplicateKey,
    InexistentDependency,
}

impl From<RegistryError> for &'static str {
    fn from(error: RegistryError) -> &'static str {
        match error {
            RegistryError::InexistentProjectId => "Project does not exist",
            RegistryError::DuplicateProjectId => "A project with the same ID already exists.",
            RegistryError::InsufficientSenderPermissions => "Sender is not a project maintainer",
            RegistryError::DuplicateMaintainer => "The account already maintains the project.",
            RegistryError::InexistentMaintainer => "The account does not maintain the project.",
            RegistryError::LastMaintainer => "The last maintainer of a project cannot be removed.",
            RegistryError::DuplicateName => "The name is already registered.",
            RegistryError::DuplicateKey => "The key is already bound to an account.",
            RegistryError::InexistentDependency => "The depended-on project does not exist.",
        }
    }
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::InexistentProjectId
            | RegistryError::InexistentMaintainer
            | RegistryError::InexistentDependency => ErrorKind::NotFound,
            RegistryError::DuplicateProjectId
            | RegistryError::DuplicateMaintainer
            | RegistryError::DuplicateName
            | RegistryError::DuplicateKey => ErrorKind::Conflict,
            RegistryError::InsufficientSenderPermissions | RegistryError::LastMaintainer => {
                ErrorKind::StructuralViolation
            }
        }
    }
}

/// Reason a ledger transaction was rejected. The transaction's batch was discarded.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TransactionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("malformed state entry at {key}")]
    CorruptState { key: String },

    /// The batch was opened on a version that is no longer the head.
    #[error("batch opened at {opened} is stale, head is {head}")]
    StaleBatch {
        opened: StateVersion,
        head: StateVersion,
    },

    /// An algorithm result computed on an older snapshot than the last committed one.
    #[error("execution at {executed} is older than the committed execution at {committed}")]
    StaleExecution {
        executed: StateVersion,
        committed: StateVersion,
    },
}

impl TransactionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransactionError::Registry(error) => error.kind(),
            TransactionError::Graph(error) => error.kind(),
            TransactionError::CorruptState { .. } => ErrorKind::StructuralViolation,
            TransactionError::StaleBatch { .. } | TransactionError::StaleExecution { .. } => {
                ErrorKind::Conflict
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn graph_error_kinds() {
        let node = NodeId::Project(crate::Id::try_from("p").unwrap());
        assert_eq!(
            GraphError::EndpointMissing(node.clone()).kind(),
            ErrorKind::StructuralViolation
        );
        assert_eq!(
            GraphError::DuplicateNode(node.clone()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(GraphError::NodeNotFound(node).kind(), ErrorKind::NotFound);
    }

    #[test]
    fn registry_error_message() {
        let error = TransactionError::from(RegistryError::LastMaintainer);
        assert_eq!(
            error.to_string(),
            "The last maintainer of a project cannot be removed."
        );
    }

    #[test]
    fn stale_executions_conflict() {
        let error = TransactionError::StaleExecution {
            executed: StateVersion(1),
            committed: StateVersion(2),
        };
        assert_eq!(error.kind(), ErrorKind::Conflict);
        assert_eq!(
            error.to_string(),
            "execution at v1 is older than the committed execution at v2"
        );
    }
}
