//! In-process blob storage with an optional byte quota.

use super::{normalize_key, BlobStorage, StorageError, StorageResult};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Map-backed storage; contents vanish with the value.
///
/// With a quota set, a write whose total key+value bytes would exceed it is
/// rejected and the previous value is kept.
#[derive(Debug, Default)]
pub struct MemoryBlobStorage {
    items: RefCell<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: RefCell::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes of all keys and values.
    pub fn used_bytes(&self) -> usize {
        self.items
            .borrow()
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum()
    }
}

impl BlobStorage for MemoryBlobStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let key = normalize_key(key)?;
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let key = normalize_key(key)?;
        if let Some(quota) = self.quota_bytes {
            let previous = self
                .items
                .borrow()
                .get(key)
                .map_or(0, |old| key.len() + old.len());
            let needed = self.used_bytes() - previous + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let key = normalize_key(key)?;
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryBlobStorage;
    use crate::storage::{BlobStorage, StorageError};

    #[test]
    fn set_get_remove_roundtrip() {
        let storage = MemoryBlobStorage::new();
        assert_eq!(storage.get_item("k").unwrap(), None);

        storage.set_item("k", "v1").unwrap();
        storage.set_item("k", "v2").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v2"));

        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn quota_rejects_oversized_write_and_keeps_previous_value() {
        let storage = MemoryBlobStorage::with_quota(8);
        storage.set_item("k", "small").unwrap();

        let err = storage.set_item("k", "much too large").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 8, .. }));
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn blank_key_is_rejected() {
        let storage = MemoryBlobStorage::new();
        assert!(matches!(
            storage.set_item("  ", "v"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
