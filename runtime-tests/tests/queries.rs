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
//! The tests in this module concern state queries.
use oscoin_ledger_client::keys::IndexRange;
use oscoin_ledger_client::*;
use oscoin_ledger_test_utils::*;

#[async_std::test]
async fn checkpoint_ranges_are_ordered_and_bounded() {
    let client = Client::new_emulator();
    let author = random_account(&client).await;
    let project_id = register_random_project(&client, &author).await;
    let mut ids = vec![client.latest_checkpoint(&project_id).await.unwrap().unwrap()];
    for _ in 0..4 {
        let committed = submit_ok(
            &client,
            &author,
            checkpoint_message(&project_id, vec![], vec![]),
        )
        .await;
        ids.push(committed.checkpoint_id().unwrap());
    }

    let range = client
        .query(&Query::Checkpoints(
            project_id.clone(),
            IndexRange::new(1, Some(3)),
        ))
        .await
        .unwrap();
    assert_eq!(range, QueryResult::CheckpointIds(ids[1..3].to_vec()));

    let all = client
        .query(&Query::Checkpoints(project_id.clone(), IndexRange::all()))
        .await
        .unwrap();
    assert_eq!(all, QueryResult::CheckpointIds(ids.clone()));

    let past_the_end = client
        .query(&Query::Checkpoints(
            project_id.clone(),
            IndexRange::new(10, None),
        ))
        .await
        .unwrap();
    assert_eq!(past_the_end, QueryResult::CheckpointIds(vec![]));

    let second = client
        .query(&Query::Checkpoint(project_id, Pointer::Index(1)))
        .await
        .unwrap();
    assert_eq!(second, QueryResult::CheckpointId(Some(ids[1])));
}

#[async_std::test]
async fn donations_and_rewards() {
    let client = Client::new_emulator();
    let author = random_account(&client).await;
    let donor = random_account(&client).await;
    let project_id = register_random_project(&client, &author).await;

    for amount in &[5, 7] {
        submit_ok(
            &client,
            &donor,
            message::Donate {
                project_id: project_id.clone(),
                amount: *amount,
            },
        )
        .await;
    }
    assert_eq!(
        client
            .query(&Query::Donations(project_id.clone(), IndexRange::all()))
            .await
            .unwrap(),
        QueryResult::Donations(vec![(donor.clone(), 5), (donor.clone(), 7)])
    );

    client
        .record_rewards(0, vec![(project_id.clone(), 100)])
        .await
        .unwrap();
    client
        .record_rewards(1, vec![(project_id.clone(), 50)])
        .await
        .unwrap();
    assert_eq!(
        client
            .query(&Query::Rewards(project_id.clone(), IndexRange::all()))
            .await
            .unwrap(),
        QueryResult::Rewards(vec![100, 50])
    );

    let error = client
        .record_rewards(2, vec![(project_id, 1), (random_id(), 1)])
        .await
        .unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::NotFound));
}

#[async_std::test]
async fn accounts_and_names() {
    let client = Client::new_emulator();
    let author = random_account(&client).await;
    let account = client.get_account(&author).await.unwrap().unwrap();
    assert_eq!(account.id, author);

    let name = "monadic".parse::<String32>().unwrap();
    let message = message::RegisterName {
        name: name.clone(),
        public_key: H256::random(),
        ttl: 3600,
    };
    submit_ok(&client, &author, message.clone()).await;

    match client.query(&Query::Name(name)).await.unwrap() {
        QueryResult::Name(Some(entry)) => {
            assert_eq!(entry.owner, author);
            assert_eq!(entry.public_key, message.public_key);
        }
        other => panic!("unexpected result {:?}", other),
    }

    let error = submit_err(&client, &random_id(), message).await;
    assert_eq!(error.kind(), Some(ErrorKind::Conflict));
}

#[async_std::test]
async fn reverse_lookups_are_unsupported() {
    let client = Client::new_emulator();
    let author = random_account(&client).await;
    let project_id = register_random_project(&client, &author).await;

    for path in &[
        format!("projects/{}/dependents", project_id),
        format!("accounts/{}/projects", author),
        format!("accounts/{}/contributions", author),
        format!("accounts/{}/names", author),
    ] {
        let query = path.parse::<Query>().unwrap();
        let error = client.query(&query).await.unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Unsupported), "{}", path);
    }

    let error = "projects/{}/unknown".parse::<Query>().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Unsupported);
}
