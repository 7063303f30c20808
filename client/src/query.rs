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

//! Query descriptors and their textual path syntax.
//!
//! A query path mirrors the key it resolves to, for example `projects/monadic/checkpoints/latest`
//! or `projects/monadic/contributions/{0..10}`. Index ranges are half open and `{a..-1}`
//! extends to the last entry.

use std::str::FromStr;

use oscoin_ledger_runtime::keys::{self, IndexRange, KeyRange};
use oscoin_ledger_runtime::{
    AccountId, AlgorithmId, ErrorKind, Fingerprint, ProjectId, String32, H256,
};

/// Either a sequence index or the `latest` pointer of a sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Pointer {
    Index(u64),
    Latest,
}

/// Everything that can be looked up in the committed ledger state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Query {
    Account(AccountId),
    Project(ProjectId),
    Members(ProjectId),
    /// Id of one checkpoint of a project.
    Checkpoint(ProjectId, Pointer),
    Checkpoints(ProjectId, IndexRange),
    /// Checkpoint metadata by checkpoint id.
    CheckpointById(H256),
    Reward(ProjectId, u64),
    Rewards(ProjectId, IndexRange),
    Name(String32),
    Contribution(ProjectId, u64),
    Contributions(ProjectId, IndexRange),
    KeyOwner(Fingerprint),
    Dependencies(ProjectId),
    Donations(ProjectId, IndexRange),
    /// Output of an algorithm computed against a state version.
    AlgorithmOutput(AlgorithmId, Pointer),

    /// Projects that depend on a project.
    Dependents(ProjectId),
    /// Projects an account maintains.
    MemberOf(AccountId),
    /// Projects an account contributed to.
    ContributedTo(AccountId),
    /// Names registered by an account.
    NamesOwnedBy(AccountId),
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The key layout only supports lookups starting from a known entity.
    #[error("reverse lookup not supported: {0}")]
    Unsupported(&'static str),

    #[error("invalid query path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("failed to decode value of {key}")]
    Codec {
        key: String,
        #[source]
        error: parity_scale_codec::Error,
    },
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Unsupported(_) | QueryError::InvalidPath { .. } => ErrorKind::Unsupported,
            QueryError::Codec { .. } => ErrorKind::StructuralViolation,
        }
    }
}

impl Query {
    /// The range of keys that holds the result of the query.
    ///
    /// Fails with [QueryError::Unsupported] for reverse lookups.
    pub fn key_range(&self) -> Result<KeyRange, QueryError> {
        let range = match self {
            Query::Account(id) => KeyRange::single(keys::account(id)),
            Query::Project(id) => KeyRange::single(keys::project(id)),
            Query::Members(id) => KeyRange::prefix(keys::project_members(id).children()),
            Query::Checkpoint(id, Pointer::Index(index)) => {
                KeyRange::single(keys::project_checkpoint(id, *index))
            }
            Query::Checkpoint(id, Pointer::Latest) => {
                KeyRange::single(keys::project_checkpoint_latest(id))
            }
            Query::Checkpoints(id, indices) => {
                KeyRange::indexed(keys::project_checkpoints(id), *indices)
            }
            Query::CheckpointById(hash) => KeyRange::single(keys::checkpoint(hash)),
            Query::Reward(id, epoch) => KeyRange::single(keys::project_reward(id, *epoch)),
            Query::Rewards(id, epochs) => KeyRange::indexed(keys::project_rewards(id), *epochs),
            Query::Name(name) => KeyRange::single(keys::name(name)),
            Query::Contribution(id, index) => {
                KeyRange::single(keys::project_contribution(id, *index))
            }
            Query::Contributions(id, indices) => {
                KeyRange::indexed(keys::project_contributions(id), *indices)
            }
            Query::KeyOwner(fingerprint) => KeyRange::single(keys::key(fingerprint)),
            Query::Dependencies(id) => {
                KeyRange::prefix(keys::project_dependencies(id).children())
            }
            Query::Donations(id, indices) => {
                KeyRange::indexed(keys::project_donations(id), *indices)
            }
            Query::AlgorithmOutput(id, Pointer::Index(version)) => {
                KeyRange::single(keys::algorithm_outputs(id).index(*version).build())
            }
            Query::AlgorithmOutput(id, Pointer::Latest) => {
                KeyRange::single(keys::algorithm_output_latest(id))
            }
            Query::Dependents(_)
            | Query::MemberOf(_)
            | Query::ContributedTo(_)
            | Query::NamesOwnedBy(_) => {
                return Err(QueryError::Unsupported(
                    self.reverse_lookup().unwrap_or("reverse lookup"),
                ))
            }
        };
        Ok(range)
    }

    /// Description of the query if it is a reverse lookup.
    ///
    /// Reverse lookups need a secondary index that the ledger does not maintain.
    pub fn reverse_lookup(&self) -> Option<&'static str> {
        match self {
            Query::Dependents(_) => Some("dependents of a project"),
            Query::MemberOf(_) => Some("projects of a maintainer"),
            Query::ContributedTo(_) => Some("projects of a contributor"),
            Query::NamesOwnedBy(_) => Some("names of an owner"),
            _ => None,
        }
    }
}

/// Parses `{a..b}` and `{a..-1}`.
fn parse_index_range(segment: &str) -> Result<IndexRange, String> {
    let inner = segment
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| format!("expected {{start..end}}, got {}", segment))?;
    let (start, end) = match inner.find("..") {
        Some(split) => (&inner[..split], &inner[split + 2..]),
        None => return Err(format!("missing '..' in {}", segment)),
    };
    let start = start
        .parse::<u64>()
        .map_err(|err| format!("invalid range start: {}", err))?;
    let end = if end == "-1" {
        None
    } else {
        Some(
            end.parse::<u64>()
                .map_err(|err| format!("invalid range end: {}", err))?,
        )
    };
    Ok(IndexRange::new(start, end))
}

fn parse_pointer(segment: &str) -> Result<Pointer, String> {
    if segment == "latest" {
        Ok(Pointer::Latest)
    } else {
        segment
            .parse::<u64>()
            .map(Pointer::Index)
            .map_err(|err| format!("invalid index {}: {}", segment, err))
    }
}

fn parse_index(segment: &str) -> Result<u64, String> {
    segment
        .parse::<u64>()
        .map_err(|err| format!("invalid index {}: {}", segment, err))
}

fn parse<T: FromStr>(segment: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    segment.parse::<T>().map_err(|err| err.to_string())
}

fn parse_path(segments: &[&str]) -> Result<Query, String> {
    let query = match segments {
        ["accounts", id] => Query::Account(parse(id)?),
        ["accounts", id, "projects"] => Query::MemberOf(parse(id)?),
        ["accounts", id, "contributions"] => Query::ContributedTo(parse(id)?),
        ["accounts", id, "names"] => Query::NamesOwnedBy(parse(id)?),

        ["projects", id] => Query::Project(parse(id)?),
        ["projects", id, "members"] | ["projects", id, "members", "{0..-1}"] => {
            Query::Members(parse(id)?)
        }
        ["projects", id, "checkpoints"] => Query::Checkpoints(parse(id)?, IndexRange::all()),
        ["projects", id, "checkpoints", index] if index.starts_with('{') => {
            Query::Checkpoints(parse(id)?, parse_index_range(index)?)
        }
        ["projects", id, "checkpoints", index] => {
            Query::Checkpoint(parse(id)?, parse_pointer(index)?)
        }
        ["projects", id, "rewards"] => Query::Rewards(parse(id)?, IndexRange::all()),
        ["projects", id, "rewards", epochs] if epochs.starts_with('{') => {
            Query::Rewards(parse(id)?, parse_index_range(epochs)?)
        }
        ["projects", id, "rewards", epoch] => Query::Reward(parse(id)?, parse_index(epoch)?),
        ["projects", id, "contributions"] => {
            Query::Contributions(parse(id)?, IndexRange::all())
        }
        ["projects", id, "contributions", index] if index.starts_with('{') => {
            Query::Contributions(parse(id)?, parse_index_range(index)?)
        }
        ["projects", id, "contributions", index] => {
            Query::Contribution(parse(id)?, parse_index(index)?)
        }
        ["projects", id, "dependencies"] | ["projects", id, "dependencies", "{0..-1}"] => {
            Query::Dependencies(parse(id)?)
        }
        ["projects", id, "dependents"] => Query::Dependents(parse(id)?),
        ["projects", id, "donations"] => Query::Donations(parse(id)?, IndexRange::all()),
        ["projects", id, "donations", indices] => {
            Query::Donations(parse(id)?, parse_index_range(indices)?)
        }

        ["checkpoints", hash] => Query::CheckpointById(parse(hash)?),
        ["names", name] => Query::Name(parse(name)?),
        ["keys", fingerprint] => Query::KeyOwner(parse(fingerprint)?),
        ["algorithms", id, "outputs", version] => {
            Query::AlgorithmOutput(parse(id)?, parse_pointer(version)?)
        }
        _ => return Err("unknown query".to_string()),
    };
    Ok(query)
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let segments = path.trim_matches('/').split('/').collect::<Vec<_>>();
        parse_path(&segments).map_err(|reason| QueryError::InvalidPath {
            path: path.to_string(),
            reason,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::TryFrom;

    fn id(s: &str) -> AccountId {
        AccountId::try_from(s).unwrap()
    }

    fn query(path: &str) -> Query {
        path.parse::<Query>()
            .unwrap_or_else(|err| panic!("{}: {}", path, err))
    }

    #[test]
    fn parse_paths() {
        assert_eq!(query("accounts/alice"), Query::Account(id("alice")));
        assert_eq!(
            query("/projects/monadic/checkpoints/latest"),
            Query::Checkpoint(id("monadic"), Pointer::Latest)
        );
        assert_eq!(
            query("projects/monadic/checkpoints/3"),
            Query::Checkpoint(id("monadic"), Pointer::Index(3))
        );
        assert_eq!(
            query("projects/monadic/checkpoints/{0..3}"),
            Query::Checkpoints(id("monadic"), IndexRange::new(0, Some(3)))
        );
        assert_eq!(
            query("projects/monadic/contributions/{2..-1}"),
            Query::Contributions(id("monadic"), IndexRange::new(2, None))
        );
        assert_eq!(
            query("projects/monadic/rewards"),
            Query::Rewards(id("monadic"), IndexRange::all())
        );
        assert_eq!(
            query("algorithms/osrank/outputs/7"),
            Query::AlgorithmOutput(id("osrank"), Pointer::Index(7))
        );
        assert_eq!(
            query("keys/0000000000000000000000000000000000000001"),
            Query::KeyOwner(Fingerprint({
                let mut bytes = [0u8; 20];
                bytes[19] = 1;
                bytes
            }))
        );
        assert_eq!(
            query("projects/monadic/dependents"),
            Query::Dependents(id("monadic"))
        );
    }

    #[test]
    fn invalid_paths() {
        for path in &[
            "",
            "projects",
            "projects/Monadic",
            "projects/monadic/checkpoints/{3}",
            "projects/monadic/checkpoints/{a..3}",
            "projects/monadic/contributions/first",
            "checkpoints/00",
        ] {
            match path.parse::<Query>() {
                Err(QueryError::InvalidPath { .. }) => {}
                other => panic!("{} parsed as {:?}", path, other),
            }
        }
    }

    #[test]
    fn reverse_lookups_are_unsupported() {
        for query in &[
            Query::Dependents(id("p")),
            Query::MemberOf(id("a")),
            Query::ContributedTo(id("a")),
            Query::NamesOwnedBy(id("a")),
        ] {
            let error = query.key_range().unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Unsupported);
        }
    }

    #[test]
    fn index_ranges_never_include_latest() {
        let p = id("p");
        let range = Query::Checkpoints(p.clone(), IndexRange::all())
            .key_range()
            .unwrap();
        assert!(range.contains(&keys::project_checkpoint(&p, u64::MAX)));
        assert!(!range.contains(&keys::project_checkpoint_latest(&p)));
    }
}
