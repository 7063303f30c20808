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

use oscoin_ledger_runtime::{ErrorKind, RunError, TransactionError};

use crate::query::QueryError;

/// Error that may be returned by any of the [crate::ClientT] methods
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transaction was rejected and had no effect
    #[error("Transaction rejected: {0}")]
    Transaction(#[from] TransactionError),

    /// An algorithm run failed or was cancelled and had no effect
    #[error("Algorithm run failed: {0}")]
    Run(#[from] RunError),

    /// The query could not be resolved
    #[error("Query failed: {0}")]
    Query(#[from] QueryError),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Classification of the underlying error. [Error::Other] has none.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Transaction(error) => Some(error.kind()),
            Error::Run(error) => Some(error.kind()),
            Error::Query(error) => Some(error.kind()),
            Error::Other(_) => None,
        }
    }
}

impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Other(error)
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error::Other(error.into())
    }
}
