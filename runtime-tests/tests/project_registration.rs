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

//! Runtime tests implemented with [Client].
//!
//! High-level runtime tests that only use the emulated [Client] and treat the runtime as a
//! black box.
//!
//! The tests in this module concern project registration and maintainers.
use oscoin_ledger_client::api::GraphReader;
use oscoin_ledger_client::graph::{EdgeId, NodeId};
use oscoin_ledger_client::*;
use oscoin_ledger_test_utils::*;

#[async_std::test]
async fn register_project() {
    let client = Client::new_emulator();
    let author = random_account(&client).await;
    let message = random_register_project_message();

    let committed = submit_ok(&client, &author, message.clone()).await;

    let project = client
        .get_project(&message.project_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.id, message.project_id);
    assert_eq!(project.account_id, message.account_id);

    // Registration creates the first checkpoint.
    let checkpoint = committed.checkpoint.unwrap();
    assert_eq!(checkpoint.index, 0);
    assert_eq!(checkpoint.parent, None);
    assert_eq!(
        client.latest_checkpoint(&message.project_id).await.unwrap(),
        Some(checkpoint.id())
    );

    let members = client
        .query(&Query::Members(message.project_id.clone()))
        .await
        .unwrap();
    assert_eq!(members, QueryResult::Members(vec![author.clone()]));

    let snapshot = client.snapshot().await;
    assert!(snapshot
        .get_node(&NodeId::Project(message.project_id.clone()))
        .is_some());
    assert!(snapshot
        .get_edge(&EdgeId::maintenance(author, message.project_id))
        .is_some());
}

#[async_std::test]
async fn register_project_with_duplicate_id() {
    let client = Client::new_emulator();
    let author = random_account(&client).await;
    let project_id = register_random_project(&client, &author).await;
    let root = client.snapshot().await.root();

    let error = submit_err(
        &client,
        &author,
        message::RegisterProject {
            project_id: project_id.clone(),
            account_id: random_id(),
            contract: graph::ContractType::Standard,
        },
    )
    .await;
    assert_eq!(error.kind(), Some(ErrorKind::Conflict));
    assert_eq!(client.snapshot().await.root(), root);
}

#[async_std::test]
async fn unregister_project() {
    let client = Client::new_emulator();
    let author = random_account(&client).await;
    let project_id = register_random_project(&client, &author).await;

    submit_ok(
        &client,
        &author,
        message::UnregisterProject {
            project_id: project_id.clone(),
        },
    )
    .await;

    assert_eq!(client.get_project(&project_id).await.unwrap(), None);
    let snapshot = client.snapshot().await;
    assert!(snapshot.get_node(&NodeId::Project(project_id.clone())).is_none());
    assert_eq!(
        client
            .query(&Query::Members(project_id))
            .await
            .unwrap(),
        QueryResult::Members(vec![])
    );
}

#[async_std::test]
async fn unregister_project_with_dependents() {
    let client = Client::new_emulator();
    let author = random_account(&client).await;
    let library = register_random_project(&client, &author).await;
    let application = register_random_project(&client, &author).await;
    depend_on(&client, &author, &application, &library).await;

    let error = submit_err(
        &client,
        &author,
        message::UnregisterProject {
            project_id: library.clone(),
        },
    )
    .await;
    assert_eq!(error.kind(), Some(ErrorKind::StructuralViolation));
    assert!(client.get_project(&library).await.unwrap().is_some());

    // The dependent's edge goes away with the dependent.
    submit_ok(
        &client,
        &author,
        message::UnregisterProject {
            project_id: application,
        },
    )
    .await;
    submit_ok(
        &client,
        &author,
        message::UnregisterProject {
            project_id: library,
        },
    )
    .await;
}

#[async_std::test]
async fn only_maintainers_change_projects() {
    let client = Client::new_emulator();
    let author = random_account(&client).await;
    let stranger = random_account(&client).await;
    let project_id = register_random_project(&client, &author).await;

    let error = submit_err(
        &client,
        &stranger,
        checkpoint_message(&project_id, vec![], vec![]),
    )
    .await;
    assert_eq!(
        error.to_string(),
        "Transaction rejected: Sender is not a project maintainer"
    );

    let error = submit_err(
        &client,
        &stranger,
        message::UnregisterProject {
            project_id: project_id.clone(),
        },
    )
    .await;
    assert_eq!(error.kind(), Some(ErrorKind::StructuralViolation));
}

#[async_std::test]
async fn add_and_remove_maintainers() {
    let client = Client::new_emulator();
    let author = random_account(&client).await;
    let other = random_account(&client).await;
    let project_id = register_random_project(&client, &author).await;

    submit_ok(
        &client,
        &author,
        message::AddMaintainer {
            project_id: project_id.clone(),
            maintainer: other.clone(),
        },
    )
    .await;
    let error = submit_err(
        &client,
        &author,
        message::AddMaintainer {
            project_id: project_id.clone(),
            maintainer: other.clone(),
        },
    )
    .await;
    assert_eq!(error.kind(), Some(ErrorKind::Conflict));

    // The new maintainer can remove the registrant.
    submit_ok(
        &client,
        &other,
        message::RemoveMaintainer {
            project_id: project_id.clone(),
            maintainer: author.clone(),
        },
    )
    .await;
    let snapshot = client.snapshot().await;
    assert!(snapshot
        .get_edge(&EdgeId::maintenance(author.clone(), project_id.clone()))
        .is_none());
    assert!(snapshot
        .get_node(&NodeId::Contributor(author.clone()))
        .is_some());

    let error = submit_err(
        &client,
        &other,
        message::RemoveMaintainer {
            project_id: project_id.clone(),
            maintainer: other.clone(),
        },
    )
    .await;
    assert_eq!(
        error.to_string(),
        "Transaction rejected: The last maintainer of a project cannot be removed."
    );
}
