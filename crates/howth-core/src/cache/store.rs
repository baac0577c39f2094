//! redb-backed artifact persistence.
//!
//! One database file at `<dir>/transforms.redb`, one table from
//! [`CacheKey::to_hex`] to a bincode-encoded artifact.

use std::path::{Path, PathBuf};

use howth_graph::Artifact;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use super::key::CacheKey;

pub const STORE_FILE: &str = "transforms.redb";

/// Bumped whenever the stored encoding changes.
pub const STORE_FORMAT_VERSION: u32 = 1;

const ARTIFACTS: TableDefinition<&str, &[u8]> = TableDefinition::new("artifacts");

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

macro_rules! database_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for CacheError {
                fn from(err: $source) -> Self {
                    CacheError::Database(err.to_string())
                }
            }
        )*
    };
}

database_error!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError,
);

#[derive(Serialize, Deserialize)]
struct StoredArtifact {
    format_version: u32,
    artifact: Artifact,
}

/// Persistent artifact store.
pub struct ArtifactStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ArtifactStore {
    /// Open or create the store under `dir`, creating the directory.
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(STORE_FILE);
        let db = Database::create(&path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ARTIFACTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` on a miss.
    pub fn get(&self, key: &CacheKey) -> Result<Option<Artifact>, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ARTIFACTS)?;
        let Some(value) = table.get(key.to_hex().as_str())? else {
            return Ok(None);
        };

        let stored: StoredArtifact = bincode::deserialize(value.value())
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;
        if stored.format_version != STORE_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                expected: STORE_FORMAT_VERSION,
                found: stored.format_version,
            });
        }
        Ok(Some(stored.artifact))
    }

    pub fn put(&self, key: &CacheKey, artifact: &Artifact) -> Result<(), CacheError> {
        let stored = StoredArtifact {
            format_version: STORE_FORMAT_VERSION,
            artifact: artifact.clone(),
        };
        let bytes =
            bincode::serialize(&stored).map_err(|e| CacheError::Serialization(e.to_string()))?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ARTIFACTS)?;
            table.insert(key.to_hex().as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ARTIFACTS)?;
            table.remove(key.to_hex().as_str())?.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ARTIFACTS)?;
        Ok(table.iter()?.count())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write()?;
        {
            write_txn.delete_table(ARTIFACTS)?;
            let _ = write_txn.open_table(ARTIFACTS)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
