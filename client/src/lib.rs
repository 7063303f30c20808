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

//! Client library to interact with the Oscoin ledger.
//!
//! The [ClientT] trait defines one method for each kind of ledger interaction. [Client]
//! implements it on top of an in memory [Emulator] of the ledger.
//!
//! ```no_run
//! # use oscoin_ledger_client::*;
//! # use std::convert::TryFrom;
//! # async fn example() -> Result<(), Error> {
//! let client = Client::new_emulator();
//! let alice = AccountId::try_from("alice").map_err(|err| err.to_string())?;
//! let project_id = ProjectId::try_from("monadic").map_err(|err| err.to_string())?;
//! client
//!     .submit(
//!         alice,
//!         message::RegisterProject {
//!             project_id: project_id.clone(),
//!             account_id: project_id.clone(),
//!             contract: graph::ContractType::Standard,
//!         }
//!         .into(),
//!     )
//!     .await?;
//! let latest = client
//!     .query(&"projects/monadic/checkpoints/latest".parse::<Query>()?)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use oscoin_ledger_runtime::api::{GraphAlgorithm, GraphReader, Interrupt};

pub use oscoin_ledger_runtime::message::{Message, Transaction};
pub use oscoin_ledger_runtime::state::{Account, Checkpoint, Project};
pub use oscoin_ledger_runtime::*;

mod emulator;
mod error;
pub mod query;
pub mod router;

pub use crate::emulator::Emulator;
pub use crate::error::Error;
pub use crate::query::{Pointer, Query, QueryError};
pub use crate::router::{QueryResult, QueryRouter};

/// Trait for ledger clients submitting transactions, running algorithms and looking up state.
#[async_trait::async_trait]
pub trait ClientT {
    /// Apply a transaction. Fails with [Error::Transaction] if the transaction was rejected.
    async fn submit_transaction(&self, transaction: Transaction) -> Result<Committed, Error>;

    /// Same as [ClientT::submit_transaction] for a message authored by `author`.
    async fn submit(&self, author: AccountId, message: Message) -> Result<Committed, Error>;

    async fn set_account(&self, account: Account) -> Result<Committed, Error>;

    async fn record_rewards(
        &self,
        epoch: u64,
        rewards: Vec<(ProjectId, Balance)>,
    ) -> Result<Committed, Error>;

    /// Resolve a query against the latest committed state.
    async fn query(&self, query: &Query) -> Result<QueryResult, Error>;

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, Error>;

    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, Error>;

    async fn get_checkpoint(&self, id: H256) -> Result<Option<Checkpoint>, Error>;

    /// Id of the latest checkpoint of a project.
    async fn latest_checkpoint(&self, project_id: &ProjectId) -> Result<Option<H256>, Error>;

    /// The latest committed snapshot of the graph and the state.
    async fn snapshot(&self) -> Snapshot;

    /// Run `algorithm` with its stored context and commit the result.
    async fn run_algorithm<A>(
        &self,
        algorithm: &A,
        contexts: &mut (dyn ContextStore + Send),
        interrupt: &Interrupt,
    ) -> Result<Committed, Error>
    where
        A: GraphAlgorithm + Sync;

    /// Drop the stored context of `algorithm`.
    async fn reset_context<A>(
        &self,
        algorithm: &A,
        contexts: &mut (dyn ContextStore + Send),
    ) -> Result<bool, Error>
    where
        A: GraphAlgorithm + Sync;
}

/// Client to interact with the Oscoin ledger.
#[derive(Clone)]
pub struct Client {
    emulator: Emulator,
}

impl Client {
    /// Create a client backed by an empty in memory ledger with the default configuration.
    pub fn new_emulator() -> Self {
        Self::new_emulator_with_config(&RuntimeConfig::default())
    }

    pub fn new_emulator_with_config(config: &RuntimeConfig) -> Self {
        Client {
            emulator: Emulator::new(config),
        }
    }

    pub fn emulator(&self) -> &Emulator {
        &self.emulator
    }
}

#[async_trait::async_trait]
impl ClientT for Client {
    async fn submit_transaction(&self, transaction: Transaction) -> Result<Committed, Error> {
        Ok(self.emulator.submit(&transaction)?)
    }

    async fn submit(&self, author: AccountId, message: Message) -> Result<Committed, Error> {
        self.submit_transaction(Transaction { author, message })
            .await
    }

    async fn set_account(&self, account: Account) -> Result<Committed, Error> {
        Ok(self.emulator.set_account(account)?)
    }

    async fn record_rewards(
        &self,
        epoch: u64,
        rewards: Vec<(ProjectId, Balance)>,
    ) -> Result<Committed, Error> {
        Ok(self.emulator.record_rewards(epoch, &rewards)?)
    }

    async fn query(&self, query: &Query) -> Result<QueryResult, Error> {
        let snapshot = self.emulator.snapshot();
        log::trace!("resolving {:?} at {}", query, snapshot.version());
        Ok(QueryRouter::new(snapshot.state()).resolve(query)?)
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        let snapshot = self.emulator.snapshot();
        Ok(QueryRouter::new(snapshot.state()).account(id)?)
    }

    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, Error> {
        let snapshot = self.emulator.snapshot();
        Ok(QueryRouter::new(snapshot.state()).project(id)?)
    }

    async fn get_checkpoint(&self, id: H256) -> Result<Option<Checkpoint>, Error> {
        let snapshot = self.emulator.snapshot();
        Ok(QueryRouter::new(snapshot.state()).checkpoint(&id)?)
    }

    async fn latest_checkpoint(&self, project_id: &ProjectId) -> Result<Option<H256>, Error> {
        let query = Query::Checkpoint(project_id.clone(), Pointer::Latest);
        match self.query(&query).await? {
            QueryResult::CheckpointId(id) => Ok(id),
            other => Err(format!("unexpected result {:?} for {:?}", other, query).into()),
        }
    }

    async fn snapshot(&self) -> Snapshot {
        self.emulator.snapshot()
    }

    async fn run_algorithm<A>(
        &self,
        algorithm: &A,
        contexts: &mut (dyn ContextStore + Send),
        interrupt: &Interrupt,
    ) -> Result<Committed, Error>
    where
        A: GraphAlgorithm + Sync,
    {
        Ok(self.emulator.run_algorithm(algorithm, contexts, interrupt)?)
    }

    async fn reset_context<A>(
        &self,
        algorithm: &A,
        contexts: &mut (dyn ContextStore + Send),
    ) -> Result<bool, Error>
    where
        A: GraphAlgorithm + Sync,
    {
        Ok(self.emulator.reset_context(algorithm, contexts)?)
    }
}
