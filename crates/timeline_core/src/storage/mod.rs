//! String-keyed blob storage port.
//!
//! # Responsibility
//! - Define the durable key/value contract the persistence adapter writes to.
//! - Isolate SQLite details from store orchestration.
//!
//! # Invariants
//! - `set_item` replaces the whole value for a key; there are no partial writes.
//! - Keys are non-empty after trimming.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryBlobStorage;
pub use sqlite::SqliteBlobStorage;

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend errors.
#[derive(Debug)]
pub enum StorageError {
    InvalidKey(String),
    QuotaExceeded { needed: usize, quota: usize },
    Db(DbError),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid storage key `{key}`"),
            Self::QuotaExceeded { needed, quota } => write!(
                f,
                "storage quota exceeded: {needed} bytes needed, {quota} allowed"
            ),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidKey(_) | Self::QuotaExceeded { .. } => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable string-keyed storage, modelled after browser local storage.
pub trait BlobStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

impl<S: BlobStorage + ?Sized> BlobStorage for &S {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }
}

pub(crate) fn normalize_key(key: &str) -> StorageResult<&str> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(trimmed)
}
