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

//! Type definitions for all entities stored in the ledger state.
//!
//! Every entity is SCALE encoded and stored under a key built by [crate::keys].

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::graph::ContractType;
use crate::{hash_of, AccountId, Balance, Fingerprint, ProjectId, PublicKey, String32, H256};

/// Balance and nonce of an account.
///
/// Accounts are owned by the ledger's account subsystem. The graph only references them.
///
/// # Storage
///
/// Stored under `accounts/:id`.
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Balance,
    pub nonce: u32,
}

/// # Storage
///
/// Stored under `projects/:id`. Maintainers are stored under `projects/:id/members/:account`.
///
/// # Relevant messages
///
/// * [crate::message::RegisterProject]
/// * [crate::message::UnregisterProject]
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Account that holds the project funds.
    pub account_id: AccountId,
    pub contract: ContractType,
}

/// A checkpoint is the immutable record of one committed batch of graph mutations for a
/// project.
///
/// Checkpoints are identified by their content hash. See [Checkpoint::id].
///
/// # Storage
///
/// Stored under `checkpoints/:hash`. The hash is stored under
/// `projects/:id/checkpoints/:index` and `projects/:id/checkpoints/latest`.
///
/// # Invariants
///
/// * `index` is `parent_index + 1`, or `0` for the first checkpoint of a project.
/// * If `parent` is [Some] then the referenced checkpoint exists in the state.
///
/// # Relevant messages
///
/// Every applied message creates a checkpoint for the project it affects.
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub project_id: ProjectId,
    pub index: u64,
    pub parent_index: Option<u64>,
    /// Previous checkpoint in the project history.
    pub parent: Option<H256>,
    /// Content hash of the whole graph after the batch was applied.
    pub graph_hash: H256,
    /// Hash that identifies the project's off-chain data, if the batch supplied one.
    pub project_hash: Option<H256>,
}

impl Checkpoint {
    pub fn id(&self) -> H256 {
        hash_of(self)
    }
}

/// One contribution to a project.
///
/// # Storage
///
/// Stored under `projects/:id/contributions/:index` where `index` is the position of the
/// contribution in the project's contribution sequence.
///
/// # Relevant messages
///
/// * [crate::message::Checkpoint]
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub index: u64,
    pub contributor: AccountId,
    /// GPG key the contribution was signed with.
    pub key: Fingerprint,
    /// Hash of the contributed commit.
    pub commit: H256,
    /// Whether `key` was bound to `contributor` when the contribution was recorded.
    pub verified: bool,
}

/// # Storage
///
/// Stored under `projects/:id/donations/:index`.
///
/// # Relevant messages
///
/// * [crate::message::Donate]
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub donor: AccountId,
    pub amount: Balance,
}

/// # Storage
///
/// Stored under `projects/:id/dependencies/:project_id`.
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub project_id: ProjectId,
    /// Checkpoint of the depended-on version.
    pub checkpoint: H256,
}

/// A registered name. Names are not part of the graph.
///
/// # Storage
///
/// Stored under `names/:name`.
///
/// # Relevant messages
///
/// * [crate::message::RegisterName]
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NameEntry {
    pub name: String32,
    pub public_key: PublicKey,
    /// Time to live in blocks.
    pub ttl: u64,
    pub owner: AccountId,
}
