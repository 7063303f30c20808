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

//! Define the command that runs osrank.

use super::*;
use oscoin_ledger_client::api::{GraphReader, Interrupt};
use oscoin_ledger_client::graph::{NodeData, NodeKind};
use oscoin_ledger_osrank::{HyperParameters, OsrankAlgorithm};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(StructOpt, Debug, Clone)]
/// Run osrank with the stored context and print the rank of every project.
///
/// The new context is stored for the next run.
pub struct Rank {
    /// JSON file with hyper-parameters. Absent fields use the defaults.
    #[structopt(long, value_name = "file")]
    params: Option<PathBuf>,

    /// Drop the stored context before running.
    #[structopt(long)]
    reset: bool,
}

#[derive(Serialize)]
struct RankReport {
    version: StateVersion,
    ranks: BTreeMap<ProjectId, f64>,
}

fn load_params(path: &Path) -> Result<HyperParameters, CommandError> {
    let invalid = |reason: String| CommandError::InvalidParams {
        path: path.to_path_buf(),
        reason,
    };
    let content = std::fs::read(path).map_err(|error| invalid(error.to_string()))?;
    serde_json::from_slice(&content).map_err(|error| invalid(error.to_string()))
}

#[async_trait::async_trait]
impl CommandT for Rank {
    async fn run(&self, command_context: &CommandContext) -> Result<(), CommandError> {
        let params = match &self.params {
            Some(path) => load_params(path)?,
            None => HyperParameters::default(),
        };
        let algorithm = OsrankAlgorithm::new(params)?;
        let client = &command_context.client;
        let mut contexts = command_context.context_storage()?;

        if self.reset && client.reset_context(&algorithm, &mut contexts).await? {
            log::info!("dropped the stored osrank context");
        }
        let committed = client
            .run_algorithm(&algorithm, &mut contexts, &Interrupt::new())
            .await?;

        let snapshot = client.snapshot().await;
        let ranks = snapshot
            .nodes(Some(NodeKind::Project))
            .filter_map(|(id, data)| match data {
                NodeData::Project(project) => Some((id.id().clone(), project.osrank.as_f64())),
                NodeData::Contributor(_) => None,
            })
            .collect();
        print_json(&RankReport {
            version: committed.version,
            ranks,
        })
    }
}
