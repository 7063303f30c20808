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

//! Stores algorithm contexts in the filesystem.
//!
//! Every context is kept in its own file named after the algorithm id. Contexts are node
//! local and never part of the ledger state.

use directories::BaseDirs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;

use oscoin_ledger_client::{AlgorithmId, Context, ContextStore};

#[derive(Debug, ThisError)]
pub enum Error {
    /// No data directory was given and the platform has none.
    #[error("Cannot determine the data directory, use --data-dir")]
    NoDataDir(),

    /// Failed to create the contexts directory
    #[error("Failed to create the contexts directory {path}: {source}")]
    FailedCreate {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// [ContextStore] backed by a directory.
#[derive(Clone, Debug)]
pub struct ContextStorage {
    dir: PathBuf,
}

const DIR: &str = "contexts";
const EXTENSION: &str = "ctx";

impl ContextStorage {
    /// Open the storage in `data_dir` or in the user's data directory if `None`.
    ///
    /// Creates the contexts directory if it does not exist yet.
    pub fn open(data_dir: Option<&Path>) -> Result<Self, Error> {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => default_data_dir()?,
        };
        let dir = data_dir.join(DIR);
        std::fs::create_dir_all(&dir).map_err(|source| Error::FailedCreate {
            path: dir.clone(),
            source,
        })?;
        Ok(ContextStorage { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, algorithm: &AlgorithmId) -> PathBuf {
        self.dir.join(algorithm.as_str()).with_extension(EXTENSION)
    }
}

fn default_data_dir() -> Result<PathBuf, Error> {
    let base = BaseDirs::new().ok_or(Error::NoDataDir())?;
    Ok(base.data_dir().join("oscoin-ledger"))
}

impl ContextStore for ContextStorage {
    fn load(&self, algorithm: &AlgorithmId) -> std::io::Result<Option<Context>> {
        match std::fs::read(self.path(algorithm)) {
            Ok(bytes) => Ok(Some(Context(bytes))),
            Err(error) if error.kind() == IoErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn store(&mut self, algorithm: &AlgorithmId, context: Context) -> std::io::Result<()> {
        // Readers never see a partially written context.
        let path = self.path(algorithm);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, context.as_bytes())?;
        std::fs::rename(&tmp, &path)
    }

    fn reset(&mut self, algorithm: &AlgorithmId) -> std::io::Result<bool> {
        match std::fs::remove_file(self.path(algorithm)) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == IoErrorKind::NotFound => Ok(false),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::TryFrom;

    fn storage(name: &str) -> ContextStorage {
        let dir = std::env::temp_dir().join(format!(
            "oscoin-ledger-cli-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        ContextStorage::open(Some(&dir)).unwrap()
    }

    #[test]
    fn store_load_reset() {
        let mut storage = storage("store-load-reset");
        let osrank = AlgorithmId::try_from("osrank").unwrap();
        assert_eq!(storage.load(&osrank).unwrap(), None);

        storage.store(&osrank, Context(vec![1, 2, 3])).unwrap();
        storage.store(&osrank, Context(vec![4])).unwrap();
        assert_eq!(storage.load(&osrank).unwrap(), Some(Context(vec![4])));

        assert!(storage.reset(&osrank).unwrap());
        assert!(!storage.reset(&osrank).unwrap());
        assert_eq!(storage.load(&osrank).unwrap(), None);
    }

    #[test]
    fn contexts_are_kept_per_algorithm() {
        let mut storage = storage("per-algorithm");
        let a = AlgorithmId::try_from("a").unwrap();
        let b = AlgorithmId::try_from("b").unwrap();
        storage.store(&a, Context(vec![1])).unwrap();
        assert_eq!(storage.load(&b).unwrap(), None);
        assert!(storage.path(&a).starts_with(storage.dir()));
    }
}
