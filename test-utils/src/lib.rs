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

//! Miscellaneous helpers used throughout ledger tests.

use std::convert::TryFrom;

use rand::distributions::Alphanumeric;
use rand::Rng;

use oscoin_ledger_client::message::{ContributionUpdate, DependencyUpdate};
use oscoin_ledger_client::*;

/// Submit a transaction and assert that it was applied.
///
/// Panics if the transaction is rejected.
pub async fn submit_ok(
    client: &Client,
    author: &AccountId,
    message: impl Into<Message>,
) -> Committed {
    let message = message.into();
    match client.submit(author.clone(), message.clone()).await {
        Ok(committed) => committed,
        Err(error) => panic!("{:?} by {} was rejected: {}", message, author, error),
    }
}

/// Submit a transaction that must be rejected and return the error.
///
/// Panics if the transaction is applied.
pub async fn submit_err(
    client: &Client,
    author: &AccountId,
    message: impl Into<Message>,
) -> Error {
    let message = message.into();
    match client.submit(author.clone(), message.clone()).await {
        Ok(committed) => panic!(
            "{:?} by {} was applied at {}",
            message, author, committed.version
        ),
        Err(error) => error,
    }
}

pub fn random_alnum_string(size: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .collect::<String>()
}

pub fn random_id() -> Id {
    let size = rand::thread_rng().gen_range(1, 33);
    Id::try_from(random_alnum_string(size).to_lowercase()).unwrap()
}

pub fn random_balance() -> Balance {
    rand::thread_rng().gen_range(20, 100)
}

/// Create an account with a random id and balance.
pub async fn random_account(client: &Client) -> AccountId {
    let id = random_id();
    client
        .set_account(Account {
            id: id.clone(),
            balance: random_balance(),
            nonce: 0,
        })
        .await
        .unwrap();
    id
}

/// Create a [message::RegisterProject] for a random project that holds its balance in an
/// account with the same id.
pub fn random_register_project_message() -> message::RegisterProject {
    let project_id = random_id();
    message::RegisterProject {
        project_id: project_id.clone(),
        account_id: project_id,
        contract: graph::ContractType::Standard,
    }
}

/// Register a random project maintained by `maintainer`.
pub async fn register_random_project(client: &Client, maintainer: &AccountId) -> ProjectId {
    let message = random_register_project_message();
    let project_id = message.project_id.clone();
    submit_ok(client, maintainer, message).await;
    project_id
}

/// A contribution by `contributor` with a random commit.
pub fn random_contribution(contributor: &AccountId, key: Fingerprint) -> ContributionUpdate {
    ContributionUpdate {
        contributor: contributor.clone(),
        key,
        commit: H256::random(),
    }
}

/// A checkpoint of `project_id` with a random project hash and the given updates.
pub fn checkpoint_message(
    project_id: &ProjectId,
    contributions: Vec<ContributionUpdate>,
    dependency_updates: Vec<DependencyUpdate>,
) -> message::Checkpoint {
    message::Checkpoint {
        project_id: project_id.clone(),
        project_hash: Some(H256::random()),
        contributions,
        dependency_updates,
    }
}

/// Make `project_id` depend on the latest checkpoint of `dependency`.
pub async fn depend_on(
    client: &Client,
    maintainer: &AccountId,
    project_id: &ProjectId,
    dependency: &ProjectId,
) -> Committed {
    let checkpoint = client
        .latest_checkpoint(dependency)
        .await
        .unwrap()
        .unwrap_or_default();
    let update = DependencyUpdate::Depend {
        project_id: dependency.clone(),
        checkpoint,
    };
    submit_ok(
        client,
        maintainer,
        checkpoint_message(project_id, vec![], vec![update]),
    )
    .await
}

/// Look up the latest checkpoint of `project_id`. Panics if the project has none.
pub async fn latest_checkpoint(client: &Client, project_id: &ProjectId) -> state::Checkpoint {
    let checkpoint_id = client
        .latest_checkpoint(project_id)
        .await
        .unwrap()
        .unwrap();
    client
        .get_checkpoint(checkpoint_id)
        .await
        .unwrap()
        .unwrap()
}
