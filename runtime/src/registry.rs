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

//! Ledger transaction processing.
//!
//! Every transaction is applied to its own [Batch]. If any step fails the batch is dropped
//! and the transaction is rejected without any observable effect.

use std::collections::BTreeSet;

use oscoin_ledger_core::api::{GraphDataWriter, GraphWriter};
use oscoin_ledger_core::graph::*;
use oscoin_ledger_core::keys::{self, IndexRange, KeyBuilder, KeyRange};
use oscoin_ledger_core::message::{self, Message, Transaction};
use oscoin_ledger_core::state::{self, Account, Contribution, Dependency, Donation, NameEntry};
use oscoin_ledger_core::{
    AccountId, Balance, ProjectId, RegistryError, StateVersion, TransactionError,
};

use crate::batch::Batch;
use crate::checkpoint::{CheckpointManager, CheckpointTarget, Committed};
use crate::config::RuntimeConfig;
use crate::entity_graph::Snapshot;

/// The ledger state and the transaction logic that mutates it.
pub struct Registry {
    checkpoints: CheckpointManager,
}

impl Registry {
    pub fn new(config: &RuntimeConfig) -> Self {
        Registry {
            checkpoints: CheckpointManager::new(config),
        }
    }

    /// Apply a transaction and commit its effects atomically.
    ///
    /// Messages that concern a project create the next checkpoint of that project.
    pub fn apply(&mut self, transaction: &Transaction) -> Result<Committed, TransactionError> {
        let mut batch = self.checkpoints.begin();
        let result = apply_message(&mut batch, &transaction.author, &transaction.message);
        if let Err(error) = &result {
            log::warn!(
                "rejected {} from {}: {}",
                message_name(&transaction.message),
                transaction.author,
                error
            );
        }
        result?;

        let target = transaction.message.project_id().map(|project_id| CheckpointTarget {
            project_id: project_id.clone(),
            project_hash: match &transaction.message {
                Message::Checkpoint(checkpoint) => checkpoint.project_hash,
                _ => None,
            },
        });
        let committed = self.checkpoints.commit(batch, target)?;
        log::debug!(
            "applied {} from {} at {}",
            message_name(&transaction.message),
            transaction.author,
            committed.version
        );
        Ok(committed)
    }

    /// Write an account. Balances and nonces are managed by the account subsystem.
    pub fn set_account(&mut self, account: Account) -> Result<Committed, TransactionError> {
        let mut batch = self.checkpoints.begin();
        batch.put(keys::account(&account.id), &account);
        self.checkpoints.commit(batch, None)
    }

    /// Record the rewards distributed to projects in `epoch`.
    pub fn record_rewards(
        &mut self,
        epoch: u64,
        rewards: &[(ProjectId, Balance)],
    ) -> Result<Committed, TransactionError> {
        let mut batch = self.checkpoints.begin();
        for (project_id, amount) in rewards {
            ensure_project(&batch, project_id)?;
            batch.put(keys::project_reward(project_id, epoch), amount);
        }
        self.checkpoints.commit(batch, None)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.checkpoints.snapshot()
    }

    pub fn snapshot_at(&self, version: StateVersion) -> Option<Snapshot> {
        self.checkpoints.snapshot_at(version)
    }

    /// Access to the checkpoint manager for committing algorithm executions.
    pub fn checkpoints_mut(&mut self) -> &mut CheckpointManager {
        &mut self.checkpoints
    }
}

fn message_name(message: &Message) -> &'static str {
    match message {
        Message::RegisterProject(_) => "RegisterProject",
        Message::UnregisterProject(_) => "UnregisterProject",
        Message::Checkpoint(_) => "Checkpoint",
        Message::AddMaintainer(_) => "AddMaintainer",
        Message::RemoveMaintainer(_) => "RemoveMaintainer",
        Message::RegisterKey(_) => "RegisterKey",
        Message::RegisterName(_) => "RegisterName",
        Message::Donate(_) => "Donate",
    }
}

fn apply_message(
    batch: &mut Batch,
    author: &AccountId,
    message: &Message,
) -> Result<(), TransactionError> {
    match message {
        Message::RegisterProject(m) => register_project(batch, author, m),
        Message::UnregisterProject(m) => unregister_project(batch, author, m),
        Message::Checkpoint(m) => checkpoint(batch, author, m),
        Message::AddMaintainer(m) => add_maintainer(batch, author, m),
        Message::RemoveMaintainer(m) => remove_maintainer(batch, author, m),
        Message::RegisterKey(m) => register_key(batch, author, m),
        Message::RegisterName(m) => register_name(batch, author, m),
        Message::Donate(m) => donate(batch, author, m),
    }
}

fn ensure_project(batch: &Batch, project_id: &ProjectId) -> Result<(), TransactionError> {
    if batch.contains(&keys::project(project_id)) {
        Ok(())
    } else {
        Err(RegistryError::InexistentProjectId.into())
    }
}

fn ensure_maintainer(
    batch: &Batch,
    project_id: &ProjectId,
    author: &AccountId,
) -> Result<(), TransactionError> {
    ensure_project(batch, project_id)?;
    if batch.contains(&keys::project_member(project_id, author)) {
        Ok(())
    } else {
        Err(RegistryError::InsufficientSenderPermissions.into())
    }
}

/// Add the contributor node of `account` unless it exists.
fn ensure_contributor(batch: &mut Batch, account: &AccountId) -> Result<(), TransactionError> {
    let node = NodeId::Contributor(account.clone());
    if !batch.graph().contains_node(&node) {
        batch.add_node(node, NodeData::Contributor(ContributorData::default()))?;
    }
    Ok(())
}

/// Index following the last indexed child of `parent`.
fn next_index(batch: &Batch, parent: KeyBuilder) -> u64 {
    batch
        .scan(&KeyRange::indexed(parent, IndexRange::all()))
        .last()
        .and_then(|(key, _)| keys::parse_index(key))
        .map_or(0, |index| index + 1)
}

fn members(batch: &Batch, project_id: &ProjectId) -> Result<Vec<AccountId>, TransactionError> {
    let range = KeyRange::prefix(keys::project_members(project_id).children());
    Ok(batch
        .scan_decoded::<AccountId>(&range)?
        .into_iter()
        .map(|(_, account)| account)
        .collect())
}

fn register_project(
    batch: &mut Batch,
    author: &AccountId,
    message: &message::RegisterProject,
) -> Result<(), TransactionError> {
    let project_id = &message.project_id;
    if batch.contains(&keys::project(project_id)) {
        return Err(RegistryError::DuplicateProjectId.into());
    }
    let project = state::Project {
        id: project_id.clone(),
        account_id: message.account_id.clone(),
        contract: message.contract.clone(),
    };
    batch.put(keys::project(project_id), &project);
    batch.add_node(
        NodeId::Project(project_id.clone()),
        NodeData::Project(ProjectData {
            osrank: Osrank::default(),
            contract: message.contract.clone(),
            account: message.account_id.clone(),
        }),
    )?;

    ensure_contributor(batch, author)?;
    batch.add_edge(
        EdgeId::maintenance(author.clone(), project_id.clone()),
        EdgeData::Maintenance,
    )?;
    batch.put(keys::project_member(project_id, author), author);
    Ok(())
}

/// Remove the project together with the edges it owns.
///
/// Maintenance edges, outgoing dependencies and incoming contributions are removed
/// explicitly. Dependencies of other projects on this one are not, so the final node
/// removal fails while any other project depends on it. Recorded contributions, donations
/// and rewards are dropped. The checkpoint chain is kept.
fn unregister_project(
    batch: &mut Batch,
    author: &AccountId,
    message: &message::UnregisterProject,
) -> Result<(), TransactionError> {
    let project_id = &message.project_id;
    ensure_maintainer(batch, project_id, author)?;

    for member in members(batch, project_id)? {
        batch.delete(keys::project_member(project_id, &member));
    }

    let node = NodeId::Project(project_id.clone());
    let owned_edges = batch
        .graph()
        .iter_neighbors(&node, Direction::Both, None)
        .filter(|neighbor| match neighbor.edge.kind {
            EdgeKind::Dependency => neighbor.edge.source == node,
            EdgeKind::Contribution | EdgeKind::Maintenance => true,
        })
        .map(|neighbor| neighbor.edge.clone())
        .collect::<BTreeSet<_>>();
    for edge in owned_edges {
        if edge.kind == EdgeKind::Dependency {
            batch.delete(keys::project_dependency(project_id, edge.target.id()));
        }
        batch.remove_edge(&edge)?;
    }

    for records in vec![
        keys::project_contributions(project_id),
        keys::project_donations(project_id),
        keys::project_rewards(project_id),
    ] {
        for (key, _) in batch.scan(&KeyRange::indexed(records, IndexRange::all())) {
            batch.delete(key);
        }
    }

    batch.delete(keys::project(project_id));
    batch.remove_node(&node)?;
    Ok(())
}

fn checkpoint(
    batch: &mut Batch,
    author: &AccountId,
    message: &message::Checkpoint,
) -> Result<(), TransactionError> {
    let project_id = &message.project_id;
    ensure_maintainer(batch, project_id, author)?;

    let mut index = next_index(batch, keys::project_contributions(project_id));
    for update in &message.contributions {
        ensure_contributor(batch, &update.contributor)?;
        let owner = batch.get::<AccountId>(&keys::key(&update.key))?;
        let verified = owner.as_ref() == Some(&update.contributor);
        batch.put(
            keys::project_contribution(project_id, index),
            &Contribution {
                index,
                contributor: update.contributor.clone(),
                key: update.key,
                commit: update.commit,
                verified,
            },
        );

        let edge = EdgeId::contribution(update.contributor.clone(), project_id.clone());
        let count = match batch.graph().edge(&edge) {
            Some(EdgeData::Contribution { count, .. }) => Some(*count),
            _ => None,
        };
        match count {
            Some(count) => batch.update_edge_data(
                &edge,
                EdgeData::Contribution {
                    index,
                    count: count.saturating_add(1),
                    key: update.key,
                    verified,
                },
            )?,
            None => batch.add_edge(
                edge,
                EdgeData::Contribution {
                    index,
                    count: 1,
                    key: update.key,
                    verified,
                },
            )?,
        }
        index += 1;
    }

    for update in &message.dependency_updates {
        match update {
            message::DependencyUpdate::Depend {
                project_id: dependency,
                checkpoint,
            } => {
                if !batch.contains(&keys::project(dependency)) {
                    return Err(RegistryError::InexistentDependency.into());
                }
                let edge = EdgeId::dependency(project_id.clone(), dependency.clone());
                let data = EdgeData::Dependency {
                    checkpoint: *checkpoint,
                };
                if batch.graph().contains_edge(&edge) {
                    batch.update_edge_data(&edge, data)?;
                } else {
                    batch.add_edge(edge, data)?;
                }
                batch.put(
                    keys::project_dependency(project_id, dependency),
                    &Dependency {
                        project_id: dependency.clone(),
                        checkpoint: *checkpoint,
                    },
                );
            }
            message::DependencyUpdate::Undepend {
                project_id: dependency,
            } => {
                batch.remove_edge(&EdgeId::dependency(project_id.clone(), dependency.clone()))?;
                batch.delete(keys::project_dependency(project_id, dependency));
            }
        }
    }
    Ok(())
}

fn add_maintainer(
    batch: &mut Batch,
    author: &AccountId,
    message: &message::AddMaintainer,
) -> Result<(), TransactionError> {
    let project_id = &message.project_id;
    ensure_maintainer(batch, project_id, author)?;
    if batch.contains(&keys::project_member(project_id, &message.maintainer)) {
        return Err(RegistryError::DuplicateMaintainer.into());
    }
    ensure_contributor(batch, &message.maintainer)?;
    batch.add_edge(
        EdgeId::maintenance(message.maintainer.clone(), project_id.clone()),
        EdgeData::Maintenance,
    )?;
    batch.put(
        keys::project_member(project_id, &message.maintainer),
        &message.maintainer,
    );
    Ok(())
}

fn remove_maintainer(
    batch: &mut Batch,
    author: &AccountId,
    message: &message::RemoveMaintainer,
) -> Result<(), TransactionError> {
    let project_id = &message.project_id;
    ensure_maintainer(batch, project_id, author)?;
    let members = members(batch, project_id)?;
    if !members.contains(&message.maintainer) {
        return Err(RegistryError::InexistentMaintainer.into());
    }
    if members.len() == 1 {
        return Err(RegistryError::LastMaintainer.into());
    }
    batch.remove_edge(&EdgeId::maintenance(
        message.maintainer.clone(),
        project_id.clone(),
    ))?;
    batch.delete(keys::project_member(project_id, &message.maintainer));
    Ok(())
}

fn register_key(
    batch: &mut Batch,
    author: &AccountId,
    message: &message::RegisterKey,
) -> Result<(), TransactionError> {
    let key = keys::key(&message.key);
    if batch.contains(&key) {
        return Err(RegistryError::DuplicateKey.into());
    }
    batch.put(key, author);
    ensure_contributor(batch, author)?;
    batch.update_node_data(
        &NodeId::Contributor(author.clone()),
        NodeData::Contributor(ContributorData {
            gpg_verified: true,
            key: Some(message.key),
        }),
    )?;
    Ok(())
}

fn register_name(
    batch: &mut Batch,
    author: &AccountId,
    message: &message::RegisterName,
) -> Result<(), TransactionError> {
    let key = keys::name(&message.name);
    if batch.contains(&key) {
        return Err(RegistryError::DuplicateName.into());
    }
    batch.put(
        key,
        &NameEntry {
            name: message.name.clone(),
            public_key: message.public_key,
            ttl: message.ttl,
            owner: author.clone(),
        },
    );
    Ok(())
}

fn donate(
    batch: &mut Batch,
    author: &AccountId,
    message: &message::Donate,
) -> Result<(), TransactionError> {
    let project_id = &message.project_id;
    ensure_project(batch, project_id)?;
    let index = next_index(batch, keys::project_donations(project_id));
    batch.put(
        keys::project_donation(project_id, index),
        &Donation {
            donor: author.clone(),
            amount: message.amount,
        },
    );
    Ok(())
}
