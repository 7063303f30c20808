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
//! The tests in this module walk through a complete ledger life cycle: a project with a
//! contribution, a checkpoint and two osrank runs.
use std::convert::TryFrom;

use oscoin_ledger_client::api::GraphReader;
use oscoin_ledger_client::graph::{NodeData, NodeId};
use oscoin_ledger_client::*;
use oscoin_ledger_runtime_tests::*;
use oscoin_ledger_test_utils::*;

#[async_std::test]
async fn contribution_checkpoint_and_ranking() {
    let client = Client::new_emulator();
    let maintainer = random_account(&client).await;
    let project_id = ProjectId::try_from("p").unwrap();
    let contributor = AccountId::try_from("c").unwrap();
    let key = Fingerprint::random();

    submit_ok(
        &client,
        &maintainer,
        message::RegisterProject {
            project_id: project_id.clone(),
            account_id: project_id.clone(),
            contract: graph::ContractType::Standard,
        },
    )
    .await;

    let contribution = random_contribution(&contributor, key);
    let committed = submit_ok(
        &client,
        &maintainer,
        checkpoint_message(&project_id, vec![contribution.clone()], vec![]),
    )
    .await;
    let h1 = committed.checkpoint_id().unwrap();

    let snapshot = client.snapshot().await;
    assert!(snapshot
        .get_node(&NodeId::Contributor(contributor.clone()))
        .is_some());

    let result = client
        .query(&"projects/p/contributions/0".parse::<Query>().unwrap())
        .await
        .unwrap();
    assert_eq!(
        result,
        QueryResult::Contribution(Some(state::Contribution {
            index: 0,
            contributor: contributor.clone(),
            key,
            commit: contribution.commit,
            verified: false,
        }))
    );

    let latest = client
        .query(&"projects/p/checkpoints/latest".parse::<Query>().unwrap())
        .await
        .unwrap();
    assert_eq!(latest, QueryResult::CheckpointId(Some(h1)));

    let algorithm = osrank();
    let mut contexts = MemoryContextStore::default();
    let algorithm_id = api::GraphAlgorithm::id(&algorithm);

    run_ok(&client, &algorithm, &mut contexts).await;
    let first_output = latest_output(&client, &algorithm_id).await.unwrap();
    let first_context = contexts.load(&algorithm_id).unwrap().unwrap();
    let ranks = project_ranks(&client).await;
    assert_eq!(ranks.len(), 1);
    assert!(ranks[0].1 > graph::Osrank::default());
    match client.snapshot().await.get_node(&NodeId::Project(project_id.clone())) {
        Some(NodeData::Project(project)) => assert_eq!(project.osrank, ranks[0].1),
        other => panic!("unexpected node {:?}", other),
    }

    run_ok(&client, &algorithm, &mut contexts).await;
    let second_output = latest_output(&client, &algorithm_id).await.unwrap();
    assert_eq!(first_output, second_output);
    assert_eq!(contexts.load(&algorithm_id).unwrap().unwrap(), first_context);
    assert_eq!(project_ranks(&client).await, ranks);

    // Ranking does not touch the checkpoint sequence.
    assert_eq!(client.latest_checkpoint(&project_id).await.unwrap(), Some(h1));
}
