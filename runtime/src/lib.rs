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

//! The Oscoin ledger runtime.
//!
//! The runtime owns the entity graph and the merkleized ledger state. Transactions are
//! applied by the [Registry] through batches that the [CheckpointManager] commits
//! atomically. Graph algorithms run through the [AlgorithmRunner] against committed
//! [Snapshot]s.

pub use oscoin_ledger_core::*;

mod batch;
mod checkpoint;
mod config;
pub mod entity_graph;
mod registry;
pub mod runner;
pub mod store;

pub use batch::Batch;
pub use checkpoint::{CheckpointManager, CheckpointTarget, Committed};
pub use config::RuntimeConfig;
pub use entity_graph::{GraphState, Snapshot};
pub use registry::Registry;
pub use runner::{AlgorithmRunner, ContextStore, Execution, MemoryContextStore, RunError};
pub use store::{StateScan, StoreSnapshot};
