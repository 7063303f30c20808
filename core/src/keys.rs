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

//! Layout of the byte keys in the merkleized state.
//!
//! A key is an ASCII namespace followed by segments, each introduced by `/`:
//!
//! * ids and names are SCALE encoded, so no id is a prefix of another one,
//! * sequence indices are `0x00` followed by the big endian `u64`, so that byte order is
//!   index order,
//! * the `latest` pointer is `0x01` followed by `latest` and sorts after every index,
//! * hashes and fingerprints are their raw bytes,
//! * fixed sub-namespaces (`members`, `checkpoints`, ...) are ASCII.
//!
//! Every query the ledger supports is a forward scan over a [KeyRange] built here.

use parity_scale_codec::Encode;

use crate::graph::{EdgeId, NodeId};
use crate::{AccountId, AlgorithmId, Fingerprint, ProjectId, StateVersion, String32, H256};

const SEPARATOR: u8 = b'/';
const INDEX_TAG: u8 = 0x00;
const LATEST_TAG: u8 = 0x01;

/// Incrementally builds a key from its segments.
#[derive(Clone, Debug)]
pub struct KeyBuilder(Vec<u8>);

impl KeyBuilder {
    pub fn namespace(namespace: &str) -> Self {
        KeyBuilder(namespace.as_bytes().to_vec())
    }

    fn segment(mut self, bytes: &[u8]) -> Self {
        self.0.push(SEPARATOR);
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn literal(self, literal: &str) -> Self {
        self.segment(literal.as_bytes())
    }

    pub fn encoded(self, value: &impl Encode) -> Self {
        value.using_encoded(|bytes| self.segment(bytes))
    }

    pub fn index(self, index: u64) -> Self {
        let mut bytes = [0u8; 9];
        bytes[0] = INDEX_TAG;
        bytes[1..].copy_from_slice(&index.to_be_bytes());
        self.segment(&bytes)
    }

    pub fn latest(self) -> Self {
        let mut bytes = vec![LATEST_TAG];
        bytes.extend_from_slice(b"latest");
        self.segment(&bytes)
    }

    pub fn raw(self, bytes: &[u8]) -> Self {
        self.segment(bytes)
    }

    /// Key prefix that matches all children of the current key.
    pub fn children(mut self) -> Vec<u8> {
        self.0.push(SEPARATOR);
        self.0
    }

    pub fn build(self) -> Vec<u8> {
        self.0
    }
}

/// Parse the index from the last segment of an indexed key.
pub fn parse_index(key: &[u8]) -> Option<u64> {
    if key.len() < 10 {
        return None;
    }
    let segment = &key[key.len() - 10..];
    if segment[0] != SEPARATOR || segment[1] != INDEX_TAG {
        return None;
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&segment[2..]);
    Some(u64::from_be_bytes(bytes))
}

/// A half open range `[start, end)` of keys. `end == None` means unbounded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    pub fn between(start: Vec<u8>, end: Option<Vec<u8>>) -> Self {
        KeyRange { start, end }
    }

    /// The range containing exactly `key`.
    pub fn single(key: Vec<u8>) -> Self {
        let mut end = key.clone();
        end.push(0);
        KeyRange {
            start: key,
            end: Some(end),
        }
    }

    /// All keys starting with `prefix`.
    pub fn prefix(prefix: Vec<u8>) -> Self {
        let end = prefix_successor(&prefix);
        KeyRange { start: prefix, end }
    }

    /// Indexed children of `parent` in `indices`. The `latest` pointer is never included.
    pub fn indexed(parent: KeyBuilder, indices: IndexRange) -> Self {
        let start = parent.clone().index(indices.start).build();
        let end = match indices.end {
            Some(end) => parent.index(end).build(),
            // Everything up to the end of the index tag.
            None => {
                let mut end = parent.children();
                end.push(INDEX_TAG + 1);
                end
            }
        };
        KeyRange {
            start,
            end: Some(end),
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice()
            && self
                .end
                .as_ref()
                .map_or(true, |end| key < end.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.end
            .as_ref()
            .map_or(false, |end| end.as_slice() <= self.start.as_slice())
    }
}

/// Smallest key greater than all keys starting with `prefix`.
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Half open range of sequence indices. `{0..-1}` in query paths is `end == None`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl IndexRange {
    pub fn all() -> Self {
        IndexRange {
            start: 0,
            end: None,
        }
    }

    pub fn new(start: u64, end: Option<u64>) -> Self {
        IndexRange { start, end }
    }
}

impl std::fmt::Display for IndexRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(f, "{{{}..{}}}", self.start, end),
            None => write!(f, "{{{}..-1}}", self.start),
        }
    }
}

pub fn account(id: &AccountId) -> Vec<u8> {
    KeyBuilder::namespace("accounts").encoded(id).build()
}

fn project_builder(id: &ProjectId) -> KeyBuilder {
    KeyBuilder::namespace("projects").encoded(id)
}

pub fn project(id: &ProjectId) -> Vec<u8> {
    project_builder(id).build()
}

pub fn project_members(id: &ProjectId) -> KeyBuilder {
    project_builder(id).literal("members")
}

pub fn project_member(id: &ProjectId, account: &AccountId) -> Vec<u8> {
    project_members(id).encoded(account).build()
}

pub fn project_checkpoints(id: &ProjectId) -> KeyBuilder {
    project_builder(id).literal("checkpoints")
}

pub fn project_checkpoint(id: &ProjectId, index: u64) -> Vec<u8> {
    project_checkpoints(id).index(index).build()
}

pub fn project_checkpoint_latest(id: &ProjectId) -> Vec<u8> {
    project_checkpoints(id).latest().build()
}

pub fn checkpoint(hash: &H256) -> Vec<u8> {
    KeyBuilder::namespace("checkpoints")
        .raw(hash.as_bytes())
        .build()
}

pub fn project_rewards(id: &ProjectId) -> KeyBuilder {
    project_builder(id).literal("rewards")
}

pub fn project_reward(id: &ProjectId, epoch: u64) -> Vec<u8> {
    project_rewards(id).index(epoch).build()
}

pub fn name(name: &String32) -> Vec<u8> {
    KeyBuilder::namespace("names").encoded(name).build()
}

pub fn project_contributions(id: &ProjectId) -> KeyBuilder {
    project_builder(id).literal("contributions")
}

pub fn project_contribution(id: &ProjectId, index: u64) -> Vec<u8> {
    project_contributions(id).index(index).build()
}

pub fn key(fingerprint: &Fingerprint) -> Vec<u8> {
    KeyBuilder::namespace("keys")
        .raw(fingerprint.as_bytes())
        .build()
}

pub fn project_dependencies(id: &ProjectId) -> KeyBuilder {
    project_builder(id).literal("dependencies")
}

pub fn project_dependency(id: &ProjectId, dependency: &ProjectId) -> Vec<u8> {
    project_dependencies(id).encoded(dependency).build()
}

pub fn project_donations(id: &ProjectId) -> KeyBuilder {
    project_builder(id).literal("donations")
}

pub fn project_donation(id: &ProjectId, index: u64) -> Vec<u8> {
    project_donations(id).index(index).build()
}

pub fn graph_nodes() -> KeyBuilder {
    KeyBuilder::namespace("graph").literal("nodes")
}

pub fn graph_node(id: &NodeId) -> Vec<u8> {
    graph_nodes().encoded(id).build()
}

pub fn graph_edges() -> KeyBuilder {
    KeyBuilder::namespace("graph").literal("edges")
}

pub fn graph_edge(id: &EdgeId) -> Vec<u8> {
    graph_edges().encoded(id).build()
}

pub fn algorithm_outputs(id: &AlgorithmId) -> KeyBuilder {
    KeyBuilder::namespace("algorithms")
        .encoded(id)
        .literal("outputs")
}

pub fn algorithm_output(id: &AlgorithmId, version: StateVersion) -> Vec<u8> {
    algorithm_outputs(id).index(version.0).build()
}

pub fn algorithm_output_latest(id: &AlgorithmId) -> Vec<u8> {
    algorithm_outputs(id).latest().build()
}

/// Snapshot version of the last committed execution of an algorithm.
pub fn algorithm_executed(id: &AlgorithmId) -> Vec<u8> {
    KeyBuilder::namespace("algorithms")
        .encoded(id)
        .literal("executed")
        .build()
}
