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

//! In memory merkleized key value store.
//!
//! [MemoryStore] keeps every committed version as an immutable [StoreSnapshot]. A commit
//! applies a [ChangeSet] to a copy of the head entries and computes the new root.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parity_scale_codec::Encode;

use oscoin_ledger_core::keys::KeyRange;
use oscoin_ledger_core::H256;

/// Read access to committed state. This is all queries need from the store.
pub trait StateScan {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Entries in `range` in ascending key order.
    fn scan(&self, range: &KeyRange) -> Vec<(Vec<u8>, Vec<u8>)>;

    /// Merkle root of the state.
    fn root(&self) -> H256;
}

type Entries = BTreeMap<Vec<u8>, Vec<u8>>;

fn bounds(range: &KeyRange) -> (Bound<&[u8]>, Bound<&[u8]>) {
    let end = match &range.end {
        Some(end) => Bound::Excluded(end.as_slice()),
        None => Bound::Unbounded,
    };
    (Bound::Included(range.start.as_slice()), end)
}

/// Writes and deletions staged for one commit. Later writes to a key replace earlier ones.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChangeSet {
    changes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.changes.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.changes.insert(key, None);
    }

    /// `Some(None)` if the key is staged for deletion, `None` if the key is untouched.
    pub fn get(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        self.changes.get(key).map(|value| value.as_deref())
    }

    pub fn range<'a>(
        &'a self,
        range: &'a KeyRange,
    ) -> impl Iterator<Item = (&'a Vec<u8>, &'a Option<Vec<u8>>)> + 'a {
        let iter = if range.is_empty() {
            None
        } else {
            Some(self.changes.range::<[u8], _>(bounds(range)))
        };
        iter.into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// One immutable version of the store.
#[derive(Clone, Debug, Default)]
pub struct StoreSnapshot {
    entries: Arc<Entries>,
    root: H256,
}

impl StoreSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateScan for StoreSnapshot {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn scan(&self, range: &KeyRange) -> Vec<(Vec<u8>, Vec<u8>)> {
        if range.is_empty() {
            return Vec::new();
        }
        self.entries
            .range::<[u8], _>(bounds(range))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn root(&self) -> H256 {
        self.root
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    head: StoreSnapshot,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.head.clone()
    }

    /// Apply all changes at once and return the new root.
    pub fn commit(&mut self, changes: ChangeSet) -> H256 {
        if changes.is_empty() {
            return self.head.root;
        }
        let mut entries = (*self.head.entries).clone();
        for (key, value) in changes.changes {
            match value {
                Some(value) => {
                    entries.insert(key, value);
                }
                None => {
                    entries.remove(&key);
                }
            }
        }
        let root = merkle_root(&entries);
        self.head = StoreSnapshot {
            entries: Arc::new(entries),
            root,
        };
        root
    }
}

/// Binary blake3 merkle tree over the encoded `(key, value)` leaves in key order.
///
/// An odd node at the end of a level is carried to the next level unchanged. The root of an
/// empty store is zero.
fn merkle_root(entries: &Entries) -> H256 {
    let mut level: Vec<[u8; 32]> = entries
        .iter()
        .map(|entry| *blake3::hash(&entry.encode()).as_bytes())
        .collect();
    if level.is_empty() {
        return H256::zero();
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => {
                    let mut hasher = blake3::Hasher::new();
                    hasher.update(left);
                    hasher.update(right);
                    *hasher.finalize().as_bytes()
                }
                _ => pair[0],
            })
            .collect();
    }
    H256(level[0])
}
