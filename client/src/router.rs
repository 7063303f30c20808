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

//! Resolve [Query]s against committed state.

use parity_scale_codec::Decode;
use serde::Serialize;

use oscoin_ledger_runtime::keys::IndexRange;
use oscoin_ledger_runtime::state::{
    Account, Checkpoint, Contribution, Dependency, Donation, NameEntry, Project,
};
use oscoin_ledger_runtime::{AccountId, Balance, ProjectId, StateScan, H256};

use crate::query::{Query, QueryError};

/// Decoded result of a [Query].
///
/// Single value lookups are `None` if the key is absent. Sequences are in key order and
/// empty if nothing is stored in the range.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    Account(Option<Account>),
    Project(Option<Project>),
    Members(Vec<AccountId>),
    CheckpointId(Option<H256>),
    CheckpointIds(Vec<H256>),
    Checkpoint(Option<Checkpoint>),
    Reward(Option<Balance>),
    Rewards(Vec<Balance>),
    Name(Option<NameEntry>),
    Contribution(Option<Contribution>),
    Contributions(Vec<Contribution>),
    KeyOwner(Option<AccountId>),
    Dependencies(Vec<(ProjectId, H256)>),
    Donations(Vec<(AccountId, Balance)>),
    /// SCALE encoded algorithm output.
    AlgorithmOutput(Option<Vec<u8>>),
}

/// Maps queries to key ranges of a [StateScan] and decodes the scanned values.
pub struct QueryRouter<'a> {
    state: &'a dyn StateScan,
}

impl<'a> QueryRouter<'a> {
    pub fn new(state: &'a dyn StateScan) -> Self {
        QueryRouter { state }
    }

    fn scan_raw(&self, query: &Query) -> Result<Vec<(Vec<u8>, Vec<u8>)>, QueryError> {
        let range = query.key_range()?;
        Ok(self.state.scan(&range))
    }

    fn scan<T: Decode>(&self, query: &Query) -> Result<Vec<T>, QueryError> {
        self.scan_raw(query)?
            .into_iter()
            .map(|(key, value)| {
                T::decode(&mut &value[..]).map_err(|error| QueryError::Codec {
                    key: String::from_utf8_lossy(&key).into_owned(),
                    error,
                })
            })
            .collect()
    }

    fn single<T: Decode>(&self, query: &Query) -> Result<Option<T>, QueryError> {
        Ok(self.scan(query)?.into_iter().next())
    }

    pub fn resolve(&self, query: &Query) -> Result<QueryResult, QueryError> {
        let result = match query {
            Query::Account(_) => QueryResult::Account(self.single(query)?),
            Query::Project(_) => QueryResult::Project(self.single(query)?),
            Query::Members(_) => QueryResult::Members(self.scan(query)?),
            Query::Checkpoint(..) => QueryResult::CheckpointId(self.single(query)?),
            Query::Checkpoints(..) => QueryResult::CheckpointIds(self.scan(query)?),
            Query::CheckpointById(_) => QueryResult::Checkpoint(self.single(query)?),
            Query::Reward(..) => QueryResult::Reward(self.single(query)?),
            Query::Rewards(..) => QueryResult::Rewards(self.scan(query)?),
            Query::Name(_) => QueryResult::Name(self.single(query)?),
            Query::Contribution(..) => QueryResult::Contribution(self.single(query)?),
            Query::Contributions(..) => QueryResult::Contributions(self.scan(query)?),
            Query::KeyOwner(_) => QueryResult::KeyOwner(self.single(query)?),
            Query::Dependencies(_) => QueryResult::Dependencies(
                self.scan::<Dependency>(query)?
                    .into_iter()
                    .map(|dependency| (dependency.project_id, dependency.checkpoint))
                    .collect(),
            ),
            Query::Donations(..) => QueryResult::Donations(
                self.scan::<Donation>(query)?
                    .into_iter()
                    .map(|donation| (donation.donor, donation.amount))
                    .collect(),
            ),
            Query::AlgorithmOutput(..) => QueryResult::AlgorithmOutput(
                self.scan_raw(query)?
                    .into_iter()
                    .next()
                    .map(|(_, value)| value),
            ),
            Query::Dependents(_)
            | Query::MemberOf(_)
            | Query::ContributedTo(_)
            | Query::NamesOwnedBy(_) => {
                return Err(QueryError::Unsupported(
                    query.reverse_lookup().unwrap_or("reverse lookup"),
                ))
            }
        };
        Ok(result)
    }

    pub fn account(&self, id: &AccountId) -> Result<Option<Account>, QueryError> {
        self.single(&Query::Account(id.clone()))
    }

    pub fn project(&self, id: &ProjectId) -> Result<Option<Project>, QueryError> {
        self.single(&Query::Project(id.clone()))
    }

    pub fn checkpoint(&self, id: &H256) -> Result<Option<Checkpoint>, QueryError> {
        self.single(&Query::CheckpointById(*id))
    }

    pub fn contributions(&self, id: &ProjectId) -> Result<Vec<Contribution>, QueryError> {
        self.scan(&Query::Contributions(id.clone(), IndexRange::all()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::query::Pointer;
    use oscoin_ledger_runtime::keys;
    use oscoin_ledger_runtime::{ErrorKind, Id, StoreSnapshot};
    use parity_scale_codec::Encode;
    use std::collections::BTreeMap;
    use std::convert::TryFrom;

    /// Sorted in memory state for router tests.
    struct Entries(BTreeMap<Vec<u8>, Vec<u8>>);

    impl StateScan for Entries {
        fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
            self.0.get(key).cloned()
        }

        fn scan(&self, range: &keys::KeyRange) -> Vec<(Vec<u8>, Vec<u8>)> {
            self.0
                .iter()
                .filter(|(key, _)| range.contains(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        }

        fn root(&self) -> H256 {
            H256::zero()
        }
    }

    fn id(s: &str) -> Id {
        Id::try_from(s).unwrap()
    }

    fn checkpoints(count: u64) -> Entries {
        let p = id("p");
        let mut entries = BTreeMap::new();
        for index in 0..count {
            entries.insert(
                keys::project_checkpoint(&p, index),
                H256([index as u8; 32]).encode(),
            );
        }
        entries.insert(
            keys::project_checkpoint_latest(&p),
            H256([count as u8; 32]).encode(),
        );
        Entries(entries)
    }

    #[test]
    fn ranges_are_ordered_and_bounded() {
        let state = checkpoints(5);
        let router = QueryRouter::new(&state);
        let result = router
            .resolve(&Query::Checkpoints(id("p"), IndexRange::new(0, Some(3))))
            .unwrap();
        assert_eq!(
            result,
            QueryResult::CheckpointIds(vec![H256([0; 32]), H256([1; 32]), H256([2; 32])])
        );

        let all = router
            .resolve(&Query::Checkpoints(id("p"), IndexRange::all()))
            .unwrap();
        match all {
            QueryResult::CheckpointIds(ids) => assert_eq!(ids.len(), 5),
            other => panic!("unexpected result {:?}", other),
        }

        let latest = router
            .resolve(&Query::Checkpoint(id("p"), Pointer::Latest))
            .unwrap();
        assert_eq!(latest, QueryResult::CheckpointId(Some(H256([5; 32]))));
    }

    #[test]
    fn empty_ranges_are_empty() {
        let state = StoreSnapshot::default();
        let router = QueryRouter::new(&state);
        assert_eq!(
            router
                .resolve(&Query::Contributions(id("p"), IndexRange::all()))
                .unwrap(),
            QueryResult::Contributions(vec![])
        );
        assert_eq!(
            router
                .resolve(&Query::Checkpoints(id("p"), IndexRange::new(3, Some(1))))
                .unwrap(),
            QueryResult::CheckpointIds(vec![])
        );
        assert_eq!(
            router.resolve(&Query::Project(id("p"))).unwrap(),
            QueryResult::Project(None)
        );
    }

    #[test]
    fn reverse_lookups_fail() {
        let state = checkpoints(1);
        let router = QueryRouter::new(&state);
        let error = router.resolve(&Query::Dependents(id("p"))).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn corrupt_values_are_reported() {
        let p = id("p");
        let mut entries = BTreeMap::new();
        entries.insert(keys::project_reward(&p, 0), vec![1, 2]);
        let state = Entries(entries);
        let error = QueryRouter::new(&state)
            .resolve(&Query::Reward(p, 0))
            .unwrap_err();
        assert!(matches!(error, QueryError::Codec { .. }));
    }
}
