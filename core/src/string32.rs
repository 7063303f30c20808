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

/// `String32` type, and its validation tests.
use parity_scale_codec::{Decode, Encode, Error as CodecError, Input};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// A [String] that is limited to 32 bytes in UTF-8 encoding.
///
/// Registered names in the `names/` namespace are `String32`s.
///
/// ```rust
/// # use oscoin_ledger_core::String32;
/// assert!(String32::from_string("a name".to_string()).is_ok());
/// let long_string = "this string has more than 32 bytes".to_string();
/// assert!(String32::from_string(long_string).is_err());
/// ```
#[derive(Encode, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct String32(String);

impl String32 {
    /// Returns an error if [String::len] of the provided is greater than 32 or if it is empty.
    pub fn from_string(s: String) -> Result<Self, String> {
        if s.is_empty() {
            Err("String32 must not be empty".to_string())
        } else if s.len() > 32 {
            Err(format!(
                "The provided string's length is {} while String32 is limited to 32 bytes",
                s.len()
            ))
        } else {
            Ok(String32(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String32> for String {
    fn from(value: String32) -> Self {
        value.0
    }
}

impl TryFrom<String> for String32 {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        String32::from_string(value)
    }
}

impl std::str::FromStr for String32 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        String32::from_string(s.to_string())
    }
}

impl std::fmt::Display for String32 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Decode for String32 {
    fn decode<I: Input>(input: &mut I) -> Result<Self, CodecError> {
        let decoded: String = String::decode(input)?;
        if decoded.is_empty() || decoded.len() > 32 {
            Err(From::from("String32 length must be between 1 and 32 bytes."))
        } else {
            Ok(String32(decoded))
        }
    }
}
