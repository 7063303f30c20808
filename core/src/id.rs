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

//! `Id` is the unique identifier for projects, accounts and algorithms.
//!
//! Ids only contain `a-z`, `0-9` and single dashes. Graph node ids and all `:id` segments of
//! the state key layout are built from them.

use std::convert::TryFrom;

use parity_scale_codec as codec;
use serde::{Deserialize, Serialize};

#[derive(
    codec::Encode, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Id(String);

impl Id {
    fn from_string(input: String) -> Result<Self, InvalidIdError> {
        // Must be at least 1 character.
        if input.is_empty() {
            return Err(InvalidIdError("must be at least 1 character"));
        }
        // Must be no longer than 32.
        if input.len() > 32 {
            return Err(InvalidIdError("must not exceed 32 characters"));
        }
        // Must only contain a-z, 0-9 and '-' characters.
        if !input
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase() || c == '-')
        {
            return Err(InvalidIdError("must only include a-z, 0-9 and '-'"));
        }
        if input.starts_with('-') {
            return Err(InvalidIdError("must not start with a '-'"));
        }
        if input.ends_with('-') {
            return Err(InvalidIdError("must not end with a '-'"));
        }
        if input.contains("--") {
            return Err(InvalidIdError(
                "must not have more than one consecutive '-'",
            ));
        }

        Ok(Self(input))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl codec::Decode for Id {
    fn decode<I: codec::Input>(input: &mut I) -> Result<Self, codec::Error> {
        let decoded: String = String::decode(input)?;

        match Id::try_from(decoded) {
            Ok(id) => Ok(id),
            Err(err) => Err(codec::Error::from(err.what())),
        }
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl TryFrom<String> for Id {
    type Error = InvalidIdError;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        Self::from_string(input)
    }
}

impl TryFrom<&str> for Id {
    type Error = InvalidIdError;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        Self::from_string(input.into())
    }
}

impl std::str::FromStr for Id {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s.to_string())
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type when conversion from an input failed.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid id: {0}")]
pub struct InvalidIdError(&'static str);

impl InvalidIdError {
    /// Error description
    pub fn what(&self) -> &'static str {
        self.0
    }
}
