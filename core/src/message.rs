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

//! Transaction related types used in the Oscoin ledger.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::graph::ContractType;
use crate::{AccountId, Balance, Fingerprint, ProjectId, PublicKey, String32, H256};

#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegisterProject {
    pub project_id: ProjectId,
    pub account_id: AccountId,
    #[serde(default)]
    pub contract: ContractType,
}

#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UnregisterProject {
    pub project_id: ProjectId,
}

/// A contribution recorded by a [Checkpoint] message.
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContributionUpdate {
    pub contributor: AccountId,
    pub key: Fingerprint,
    pub commit: H256,
}

#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DependencyUpdate {
    /// Add a dependency on a version of another project.
    Depend {
        project_id: ProjectId,
        checkpoint: H256,
    },
    /// Remove the dependency on another project.
    Undepend { project_id: ProjectId },
}

/// Record new contributions and dependency changes of a project.
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub project_id: ProjectId,
    /// Hash of the project's off-chain data at this checkpoint.
    #[serde(default)]
    pub project_hash: Option<H256>,
    #[serde(default)]
    pub contributions: Vec<ContributionUpdate>,
    #[serde(default)]
    pub dependency_updates: Vec<DependencyUpdate>,
}

#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AddMaintainer {
    pub project_id: ProjectId,
    pub maintainer: AccountId,
}

#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RemoveMaintainer {
    pub project_id: ProjectId,
    pub maintainer: AccountId,
}

/// Bind a GPG key to the author's account.
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegisterKey {
    pub key: Fingerprint,
}

#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegisterName {
    pub name: String32,
    pub public_key: PublicKey,
    pub ttl: u64,
}

/// Record a donation from the author to a project.
///
/// Moving the funds is the account subsystem's job. The ledger only records the donation.
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Donate {
    pub project_id: ProjectId,
    pub amount: Balance,
}

#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    RegisterProject(RegisterProject),
    UnregisterProject(UnregisterProject),
    Checkpoint(Checkpoint),
    AddMaintainer(AddMaintainer),
    RemoveMaintainer(RemoveMaintainer),
    RegisterKey(RegisterKey),
    RegisterName(RegisterName),
    Donate(Donate),
}

impl Message {
    /// The project whose checkpoint sequence the message extends, if any.
    pub fn project_id(&self) -> Option<&ProjectId> {
        match self {
            Message::RegisterProject(m) => Some(&m.project_id),
            Message::UnregisterProject(m) => Some(&m.project_id),
            Message::Checkpoint(m) => Some(&m.project_id),
            Message::AddMaintainer(m) => Some(&m.project_id),
            Message::RemoveMaintainer(m) => Some(&m.project_id),
            Message::Donate(m) => Some(&m.project_id),
            Message::RegisterKey(_) | Message::RegisterName(_) => None,
        }
    }
}

/// A message authored by an account.
///
/// Signatures are checked before transactions reach the ledger.
#[derive(Decode, Encode, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub author: AccountId,
    pub message: Message,
}

impl Transaction {
    pub fn new(author: AccountId, message: impl Into<Message>) -> Self {
        Transaction {
            author,
            message: message.into(),
        }
    }
}

macro_rules! impl_into_message {
    ($($name:ident),*) => {
        $(
            impl From<$name> for Message {
                fn from(message: $name) -> Self {
                    Message::$name(message)
                }
            }
        )*
    };
}

impl_into_message!(
    RegisterProject,
    UnregisterProject,
    Checkpoint,
    AddMaintainer,
    RemoveMaintainer,
    RegisterKey,
    RegisterName,
    Donate
);
