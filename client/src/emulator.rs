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

//! Provides [Emulator] to run the ledger in memory.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use oscoin_ledger_runtime::api::{GraphAlgorithm, Interrupt};
use oscoin_ledger_runtime::message::Transaction;
use oscoin_ledger_runtime::state::Account;
use oscoin_ledger_runtime::{
    AlgorithmRunner, Balance, Committed, ContextStore, ProjectId, Registry, RunError,
    RuntimeConfig, Snapshot, StateVersion, TransactionError,
};

/// In memory ledger.
///
/// # Differences with a real node
///
/// * Every submitted transaction is committed on its own. There are no blocks.
///
/// * Transactions are applied in the order they are submitted. Clones share the ledger.
#[derive(Clone)]
pub struct Emulator {
    registry: Arc<Mutex<Registry>>,
    runner: Arc<AlgorithmRunner>,
}

impl Emulator {
    pub fn new(config: &RuntimeConfig) -> Self {
        Emulator {
            registry: Arc::new(Mutex::new(Registry::new(config))),
            runner: Arc::new(AlgorithmRunner::new(config)),
        }
    }

    /// Batches are only published on commit, so the registry behind a poisoned lock is
    /// consistent.
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn submit(&self, transaction: &Transaction) -> Result<Committed, TransactionError> {
        self.registry().apply(transaction)
    }

    pub fn set_account(&self, account: Account) -> Result<Committed, TransactionError> {
        self.registry().set_account(account)
    }

    pub fn record_rewards(
        &self,
        epoch: u64,
        rewards: &[(ProjectId, Balance)],
    ) -> Result<Committed, TransactionError> {
        self.registry().record_rewards(epoch, rewards)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.registry().snapshot()
    }

    pub fn snapshot_at(&self, version: StateVersion) -> Option<Snapshot> {
        self.registry().snapshot_at(version)
    }

    /// Run `algorithm` against the current head.
    ///
    /// The ledger is only locked to take the snapshot and to commit the result. Transactions
    /// submitted in between are not seen by the algorithm.
    pub fn run_algorithm<A: GraphAlgorithm>(
        &self,
        algorithm: &A,
        contexts: &mut dyn ContextStore,
        interrupt: &Interrupt,
    ) -> Result<Committed, RunError> {
        let snapshot = self.snapshot();
        let execution = self
            .runner
            .execute(algorithm, &snapshot, &*contexts, interrupt)?;
        let mut registry = self.registry();
        self.runner
            .commit(execution, registry.checkpoints_mut(), contexts)
    }

    pub fn reset_context<A: GraphAlgorithm>(
        &self,
        algorithm: &A,
        contexts: &mut dyn ContextStore,
    ) -> Result<bool, RunError> {
        self.runner.reset_context(algorithm, contexts)
    }
}
