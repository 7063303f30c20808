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

//! Fixed size byte types: [H256] digests and GPG key [Fingerprint]s.
//!
//! Both are SCALE encoded as raw bytes and rendered as lower case hex strings.

use std::convert::TryFrom;

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Error returned when parsing a fixed size byte type from hex fails.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum InvalidHexError {
    #[error("invalid hex string: {0}")]
    Hex(String),
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

fn decode_hex<const N: usize>(s: &str) -> Result<[u8; N], InvalidHexError> {
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .map_err(|err| InvalidHexError::Hex(err.to_string()))?;
    if bytes.len() != N {
        return Err(InvalidHexError::Length {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// 256 bit digest. Checkpoint ids, graph content hashes and merkle roots are `H256`s.
#[derive(
    Encode, Decode, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct H256(pub [u8; 32]);

impl H256 {
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Random hash, useful for tests and fixtures.
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl From<blake3::Hash> for H256 {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl std::str::FromStr for H256 {
    type Err = InvalidHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(Self)
    }
}

impl TryFrom<String> for H256 {
    type Error = InvalidHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<H256> for String {
    fn from(value: H256) -> Self {
        hex::encode(value.0)
    }
}

impl std::fmt::Display for H256 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for H256 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "H256({})", hex::encode(&self.0[..4]))
    }
}

/// Public key of a registered name.
pub type PublicKey = H256;

/// A GPG v4 key fingerprint (160 bits).
///
/// Contributions are signed with GPG keys. A fingerprint is bound to an account with
/// [crate::message::RegisterKey] and resolved through the `keys/:fingerprint` key.
#[derive(
    Encode, Decode, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(pub [u8; 20]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn random() -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&H256::random().0[..20]);
        Self(bytes)
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = InvalidHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(Self)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = InvalidHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        hex::encode(value.0)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Fingerprint({})", hex::encode(self.0))
    }
}

/// Hash the SCALE encoding of a value.
pub fn hash_of<T: Encode + ?Sized>(value: &T) -> H256 {
    value.using_encoded(|bytes| blake3::hash(bytes).into())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_display_identity() {
        let hash = H256::random();
        assert_eq!(hash.to_string().parse::<H256>().unwrap(), hash);

        let fingerprint = Fingerprint::random();
        let text = fingerprint.to_string();
        assert_eq!(text.len(), 40);
        assert_eq!(text.parse::<Fingerprint>().unwrap(), fingerprint);
    }

    #[test]
    fn parse_wrong_length() {
        assert_eq!(
            "abcd".parse::<H256>(),
            Err(InvalidHexError::Length {
                expected: 32,
                actual: 2
            })
        );
        assert!("zz".parse::<Fingerprint>().is_err());
    }

    #[test]
    fn hash_of_is_stable() {
        assert_eq!(hash_of(&(1u32, "a")), hash_of(&(1u32, "a")));
        assert_ne!(hash_of(&(1u32, "a")), hash_of(&(2u32, "a")));
    }
}
