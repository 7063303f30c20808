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

//! Define the commands supported by the CLI that inspect the replayed ledger.

use super::*;
use oscoin_ledger_client::api::GraphReader;

#[derive(StructOpt, Debug, Clone)]
/// Print the outcome of every scripted transaction.
///
/// Fails if any transaction was rejected.
pub struct Apply {}

#[async_trait::async_trait]
impl CommandT for Apply {
    async fn run(&self, command_context: &CommandContext) -> Result<(), CommandError> {
        let outcomes = &command_context.outcomes;
        let mut failed = 0;
        for (position, outcome) in outcomes.iter().enumerate() {
            let name = message_name(&outcome.transaction.message);
            match &outcome.result {
                Ok(committed) => {
                    print!(
                        "#{} {} by {}: applied at {}",
                        position, name, outcome.transaction.author, committed.version
                    );
                    match committed.checkpoint_id() {
                        Some(checkpoint_id) => println!(", checkpoint {}", checkpoint_id),
                        None => println!(),
                    }
                }
                Err(error) => {
                    failed += 1;
                    println!(
                        "#{} {} by {}: rejected: {}",
                        position, name, outcome.transaction.author, error
                    );
                }
            }
        }

        let snapshot = command_context.client.snapshot().await;
        println!("state root: {}", snapshot.root());
        println!("graph hash: {}", snapshot.content_hash());

        if failed > 0 {
            return Err(CommandError::RejectedTransactions {
                failed,
                total: outcomes.len(),
            });
        }
        Ok(())
    }
}

fn message_name(message: &Message) -> &'static str {
    match message {
        Message::RegisterProject(_) => "register project",
        Message::UnregisterProject(_) => "unregister project",
        Message::Checkpoint(_) => "checkpoint",
        Message::AddMaintainer(_) => "add maintainer",
        Message::RemoveMaintainer(_) => "remove maintainer",
        Message::RegisterKey(_) => "register key",
        Message::RegisterName(_) => "register name",
        Message::Donate(_) => "donate",
    }
}

#[derive(StructOpt, Debug, Clone)]
/// Resolve a query path, for example `projects/monadic/checkpoints/{0..-1}`.
pub struct Query {
    /// The query path.
    path: oscoin_ledger_client::Query,
}

#[async_trait::async_trait]
impl CommandT for Query {
    async fn run(&self, command_context: &CommandContext) -> Result<(), CommandError> {
        let result = command_context.client.query(&self.path).await?;
        print_json(&result)
    }
}
