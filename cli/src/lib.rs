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

//! Define the command line parser and interface.

use std::path::PathBuf;
use structopt::StructOpt;
use thiserror::Error as ThisError;

use oscoin_ledger_client::*;

pub mod context_storage;
pub mod logger;
pub mod script;

mod command;
use command::{context, ledger, rank};
use script::LedgerScript;

/// The type that captures the command line.
#[derive(StructOpt, Debug, Clone)]
#[structopt(name = "oscoin-ledger", max_term_width = 80)]
pub struct CommandLine {
    #[structopt(flatten)]
    pub options: LedgerOptions,

    #[structopt(subcommand)]
    pub command: Command,
}

impl CommandLine {
    pub async fn run(self) -> Result<(), CommandError> {
        let command_context = self.options.command_context().await?;
        self.command.run(&command_context).await
    }
}

/// Ledger related command-line options
#[derive(StructOpt, Debug, Clone)]
pub struct LedgerOptions {
    /// JSON ledger script replayed before the command runs. The ledger is empty if absent.
    #[structopt(long, env = "OSCOIN_LEDGER", value_name = "file")]
    pub ledger: Option<PathBuf>,

    /// Directory holding node-local algorithm contexts. Defaults to the user data directory.
    #[structopt(long, env = "OSCOIN_DATA_DIR", value_name = "dir")]
    pub data_dir: Option<PathBuf>,

    /// Timeout of a single algorithm execution in milliseconds.
    #[structopt(long, env = "OSCOIN_TIMEOUT_MS", value_name = "ms")]
    pub timeout_ms: Option<u64>,
}

impl LedgerOptions {
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            algorithm_timeout_ms: self.timeout_ms,
            ..RuntimeConfig::default()
        }
    }

    /// Replay the ledger script into a new emulated ledger.
    pub async fn command_context(&self) -> Result<CommandContext, CommandError> {
        let client = Client::new_emulator_with_config(&self.runtime_config());
        let outcomes = match &self.ledger {
            Some(path) => LedgerScript::load(path)?.replay(&client).await?,
            None => Vec::new(),
        };
        Ok(CommandContext {
            client,
            outcomes,
            data_dir: self.data_dir.clone(),
        })
    }
}

/// Contextual data for running commands. Created from the command line options.
pub struct CommandContext {
    pub client: Client,
    /// Outcomes of the scripted transactions, in script order.
    pub outcomes: Vec<script::Outcome>,
    pub data_dir: Option<PathBuf>,
}

impl CommandContext {
    pub fn context_storage(&self) -> Result<context_storage::ContextStorage, CommandError> {
        Ok(context_storage::ContextStorage::open(
            self.data_dir.as_deref(),
        )?)
    }
}

/// The supported [CommandLine] commands.
#[derive(StructOpt, Debug, Clone)]
pub enum Command {
    /// Show the outcome of every scripted transaction.
    Apply(ledger::Apply),
    /// Resolve a query path against the ledger state and print the result as JSON.
    Query(ledger::Query),
    /// Run osrank on the ledger and print the ranks.
    Rank(rank::Rank),
    /// Manage node-local algorithm contexts.
    Context(context::Command),
}

#[async_trait::async_trait]
impl CommandT for Command {
    async fn run(&self, command_context: &CommandContext) -> Result<(), CommandError> {
        match self {
            Command::Apply(cmd) => cmd.run(command_context).await,
            Command::Query(cmd) => cmd.run(command_context).await,
            Command::Rank(cmd) => cmd.run(command_context).await,
            Command::Context(cmd) => cmd.run(command_context).await,
        }
    }
}

/// The trait that every command must implement.
#[async_trait::async_trait]
pub trait CommandT {
    async fn run(&self, command_context: &CommandContext) -> Result<(), CommandError>;
}

/// Error returned by [CommandT::run].
#[derive(Debug, ThisError)]
pub enum CommandError {
    #[error(transparent)]
    ClientError(#[from] Error),

    #[error(transparent)]
    Script(#[from] script::ScriptError),

    #[error(transparent)]
    ContextStorage(#[from] context_storage::Error),

    #[error("cannot read hyper-parameters from {path}: {reason}")]
    InvalidParams { path: PathBuf, reason: String },

    #[error(transparent)]
    Osrank(#[from] oscoin_ledger_osrank::OsrankError),

    #[error("cannot encode output")]
    Output(#[from] serde_json::Error),

    #[error("{failed} of {total} scripted transactions were rejected")]
    RejectedTransactions { failed: usize, total: usize },
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::TryFrom;

    fn parse(args: &[&str]) -> Result<CommandLine, structopt::clap::Error> {
        CommandLine::from_iter_safe(std::iter::once("oscoin-ledger").chain(args.iter().copied()))
    }

    #[test]
    fn parse_commands() {
        let command_line = parse(&["--timeout-ms", "250", "query", "projects/p/checkpoints/latest"])
            .unwrap();
        assert_eq!(
            command_line.options.runtime_config().algorithm_timeout_ms,
            Some(250)
        );
        assert!(matches!(command_line.command, Command::Query(_)));

        assert!(matches!(
            parse(&["rank", "--reset"]).unwrap().command,
            Command::Rank(_)
        ));
        assert!(matches!(
            parse(&["context", "reset", "osrank"]).unwrap().command,
            Command::Context(_)
        ));
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        assert!(parse(&["query", "projects"]).is_err());
        assert!(parse(&["context", "reset", "Not An Id"]).is_err());
    }

    #[async_std::test]
    async fn empty_ledger_without_script() {
        let options = LedgerOptions {
            ledger: None,
            data_dir: None,
            timeout_ms: None,
        };
        let command_context = options.command_context().await.unwrap();
        assert!(command_context.outcomes.is_empty());
        let result = command_context
            .client
            .query(&Query::Project(ProjectId::try_from("p").unwrap()))
            .await
            .unwrap();
        assert_eq!(result, QueryResult::Project(None));
    }
}
