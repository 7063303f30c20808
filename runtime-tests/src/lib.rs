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

//! Helpers shared by the black box runtime tests in `tests/`.

use oscoin_ledger_client::api::Interrupt;
use oscoin_ledger_client::*;
use oscoin_ledger_osrank::{HyperParameters, OsrankAlgorithm};

/// Osrank with the default parameters.
pub fn osrank() -> OsrankAlgorithm {
    OsrankAlgorithm::new(HyperParameters::default()).unwrap()
}

/// Run `algorithm` with the contexts in `contexts` and panic if the run fails.
pub async fn run_ok<A>(
    client: &Client,
    algorithm: &A,
    contexts: &mut MemoryContextStore,
) -> Committed
where
    A: api::GraphAlgorithm + Sync,
{
    client
        .run_algorithm(algorithm, contexts, &Interrupt::new())
        .await
        .unwrap()
}

/// The latest SCALE encoded output of the algorithm `id`.
pub async fn latest_output(client: &Client, id: &AlgorithmId) -> Option<Vec<u8>> {
    let query = Query::AlgorithmOutput(id.clone(), Pointer::Latest);
    match client.query(&query).await.unwrap() {
        QueryResult::AlgorithmOutput(output) => output,
        other => panic!("unexpected result {:?}", other),
    }
}

/// The osrank of every project in the latest snapshot, ordered by project id.
pub async fn project_ranks(client: &Client) -> Vec<(ProjectId, graph::Osrank)> {
    use api::GraphReader;

    let snapshot = client.snapshot().await;
    let ranks = snapshot
        .nodes(Some(graph::NodeKind::Project))
        .filter_map(|(id, data)| match data {
            graph::NodeData::Project(project) => Some((id.id().clone(), project.osrank)),
            graph::NodeData::Contributor(_) => None,
        })
        .collect::<Vec<_>>();
    ranks
}
