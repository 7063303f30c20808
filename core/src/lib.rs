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

//! Basic types used in the Oscoin ledger graph.
//!
//! This crate is shared by the ledger runtime, ranking algorithms and clients. It contains
//! the graph model ([graph]), the capabilities over the graph ([api]), the ledger
//! entities ([state], [message]) and the layout of their keys in the merkleized state
//! ([keys]).

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

pub mod api;
pub mod graph;
pub mod keys;
pub mod message;
pub mod state;

mod error;
pub use error::{ErrorKind, GraphError, RegistryError, TransactionError};

mod hash;
pub use hash::{hash_of, Fingerprint, InvalidHexError, PublicKey, H256};

mod id;
pub use id::{Id, InvalidIdError};

pub mod string32;
pub use string32::String32;

/// Identifier of an account.
///
/// Each account has an associated [state::Account] and may own a contributor node.
pub type AccountId = Id;

/// Identifier of a project node.
pub type ProjectId = Id;

/// Identifier of a [api::GraphAlgorithm]. Contexts and outputs are keyed by it.
pub type AlgorithmId = Id;

/// Balance of an account.
pub type Balance = u128;

/// Version of the committed ledger state.
///
/// Incremented by one with every commit.
#[derive(
    Decode,
    Encode,
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display(fmt = "v{}", _0)]
pub struct StateVersion(pub u64);

impl StateVersion {
    pub fn next(self) -> Self {
        StateVersion(self.0 + 1)
    }
}

/// Opaque cache an algorithm threads through its executions.
///
/// The ledger never interprets the bytes. Contexts are kept node-locally and are not part of
/// the merkleized state.
#[derive(Decode, Encode, Clone, Debug, Default, Eq, PartialEq, derive_more::From)]
pub struct Context(pub Vec<u8>);

impl Context {
    pub fn empty() -> Self {
        Context(Vec::new())
    }

    /// SCALE encode `value` into a context.
    pub fn encode_from<T: Encode>(value: &T) -> Self {
        Context(value.encode())
    }

    /// SCALE decode the context. Fails for contexts that were not produced by
    /// [Context::encode_from] with the same type.
    pub fn decode_into<T: Decode>(&self) -> Result<T, parity_scale_codec::Error> {
        T::decode(&mut &self.0[..])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
