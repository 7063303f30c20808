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

//! Nodes and edges of the project/contributor graph.
//!
//! The graph has two node kinds, [NodeKind::Project] and [NodeKind::Contributor], each with
//! its own id namespace. Edges are directed and identified by `(source, target, kind)`:
//!
//! * [EdgeKind::Dependency]: project → project it depends on.
//! * [EdgeKind::Contribution]: contributor → project contributed to.
//! * [EdgeKind::Maintenance]: contributor → project maintained.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Fingerprint, Id, ProjectId, H256};

#[derive(
    Encode, Decode, Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum NodeKind {
    Project,
    Contributor,
}

/// Identity of a graph node: its kind namespace and its id within that namespace.
#[derive(
    Encode, Decode, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum NodeId {
    Project(ProjectId),
    Contributor(AccountId),
}

impl NodeId {
    pub fn new(kind: NodeKind, id: Id) -> Self {
        match kind {
            NodeKind::Project => NodeId::Project(id),
            NodeKind::Contributor => NodeId::Contributor(id),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeId::Project(_) => NodeKind::Project,
            NodeId::Contributor(_) => NodeKind::Contributor,
        }
    }

    pub fn id(&self) -> &Id {
        match self {
            NodeId::Project(id) | NodeId::Contributor(id) => id,
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            NodeId::Project(id) => write!(f, "project:{}", id),
            NodeId::Contributor(id) => write!(f, "contributor:{}", id),
        }
    }
}

/// Osrank of a node as a fixed point fraction where [Osrank::ONE] represents `1.0`.
///
/// Fixed point keeps the value SCALE encodable and makes equality across ledger nodes exact.
#[derive(
    Encode,
    Decode,
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct Osrank(pub u64);

impl Osrank {
    pub const ONE: u64 = 1_000_000_000;

    /// Convert from a float. Negative and NaN values map to zero.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() || value <= 0.0 {
            Osrank(0)
        } else {
            Osrank((value * Self::ONE as f64).round() as u64)
        }
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / Self::ONE as f64
    }
}

impl std::fmt::Display for Osrank {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:.9}", self.as_f64())
    }
}

/// The contract governing a project's funds.
#[derive(Encode, Decode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ContractType {
    /// The ledger's built-in contract.
    Standard,
    /// Custom contract identified by the hash of its code.
    Custom(H256),
}

impl Default for ContractType {
    fn default() -> Self {
        ContractType::Standard
    }
}

#[derive(Encode, Decode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    /// Written by the ranking algorithm through [crate::api::OsrankField].
    pub osrank: Osrank,
    pub contract: ContractType,
    /// Account holding the project's balance.
    pub account: AccountId,
}

#[derive(Encode, Decode, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContributorData {
    /// Whether `key` is bound to the contributor's account in the `keys/` namespace.
    pub gpg_verified: bool,
    pub key: Option<Fingerprint>,
}

/// Kind specific payload of a node.
#[derive(Encode, Decode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NodeData {
    Project(ProjectData),
    Contributor(ContributorData),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Project(_) => NodeKind::Project,
            NodeData::Contributor(_) => NodeKind::Contributor,
        }
    }
}

#[derive(
    Encode, Decode, Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum EdgeKind {
    Dependency,
    Contribution,
    Maintenance,
}

/// Identity of an edge. At most one edge exists per `(source, target, kind)`.
#[derive(
    Encode, Decode, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct EdgeId {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
}

impl EdgeId {
    pub fn new(source: NodeId, target: NodeId, kind: EdgeKind) -> Self {
        EdgeId {
            source,
            target,
            kind,
        }
    }

    pub fn dependency(project: ProjectId, dependency: ProjectId) -> Self {
        Self::new(
            NodeId::Project(project),
            NodeId::Project(dependency),
            EdgeKind::Dependency,
        )
    }

    pub fn contribution(contributor: AccountId, project: ProjectId) -> Self {
        Self::new(
            NodeId::Contributor(contributor),
            NodeId::Project(project),
            EdgeKind::Contribution,
        )
    }

    pub fn maintenance(maintainer: AccountId, project: ProjectId) -> Self {
        Self::new(
            NodeId::Contributor(maintainer),
            NodeId::Project(project),
            EdgeKind::Maintenance,
        )
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} -[{:?}]-> {}", self.source, self.kind, self.target)
    }
}

/// Kind specific payload of an edge.
#[derive(Encode, Decode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum EdgeData {
    Dependency {
        /// Checkpoint of the depended-on project version.
        checkpoint: H256,
    },
    Contribution {
        /// Sequence index of the latest contribution along this edge.
        index: u64,
        /// Number of contributions along this edge.
        count: u32,
        key: Fingerprint,
        verified: bool,
    },
    Maintenance,
}

impl EdgeData {
    pub fn kind(&self) -> EdgeKind {
        match self {
            EdgeData::Dependency { .. } => EdgeKind::Dependency,
            EdgeData::Contribution { .. } => EdgeKind::Contribution,
            EdgeData::Maintenance => EdgeKind::Maintenance,
        }
    }
}

/// Direction of a traversal relative to the starting node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}
