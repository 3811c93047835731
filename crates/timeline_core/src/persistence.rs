//! Write-through persistence of the timeline collection.
//!
//! # Responsibility
//! - Load the collection from one storage key, falling back to seed data.
//! - Replace the stored blob with the whole collection on every save.
//!
//! # Invariants
//! - Load never fails: unreadable or unparseable blobs fall back to seeds.
//! - Malformed stored records are skipped one by one, never the whole blob.
//! - Save always writes the complete collection as a JSON array.

use crate::model::task::{TaskId, TaskKind, TaskRecord};
use crate::storage::{BlobStorage, StorageError};
use chrono::{TimeZone, Utc};
use log::{error, info, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Storage key holding the serialized collection.
pub const STORAGE_KEY: &str = "timeline-items";

/// What to start with when nothing usable is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedPolicy {
    /// Three fixed sample accomplishments.
    #[default]
    Samples,
    /// An empty timeline.
    Empty,
}

/// Where a loaded collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Stored,
    Seeded,
}

/// Result of [`TimelinePersistence::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub records: Vec<TaskRecord>,
    pub source: LoadSource,
    /// Stored entries dropped as malformed or duplicate-id.
    pub skipped: usize,
}

/// Save failure; callers report it as a non-fatal notice.
#[derive(Debug)]
pub enum PersistError {
    Serialize(serde_json::Error),
    Storage(StorageError),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "failed to serialize timeline: {err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<StorageError> for PersistError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Persistence adapter over an injected blob storage port.
pub struct TimelinePersistence<S: BlobStorage> {
    storage: S,
    seed_policy: SeedPolicy,
}

impl<S: BlobStorage> TimelinePersistence<S> {
    pub fn new(storage: S, seed_policy: SeedPolicy) -> Self {
        Self {
            storage,
            seed_policy,
        }
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        self.seed_policy
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Reads the stored collection, or seed data when absent/unparseable.
    pub fn load(&self) -> LoadOutcome {
        let raw = match self.storage.get_item(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!(
                    "event=timeline_load module=persistence status=ok source=seed reason=absent"
                );
                return self.seeded();
            }
            Err(err) => {
                error!(
                    "event=timeline_load module=persistence status=error source=seed error_code=storage_read_failed error={}",
                    err
                );
                return self.seeded();
            }
        };

        let entries = match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "event=timeline_load module=persistence status=error source=seed error_code=blob_unparseable error={}",
                    err
                );
                return self.seeded();
            }
        };

        let total = entries.len();
        let mut seen: HashSet<TaskId> = HashSet::with_capacity(total);
        let mut records = Vec::with_capacity(total);
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<TaskRecord>(entry) {
                Ok(record) if seen.insert(record.id) => records.push(record),
                Ok(record) => warn!(
                    "event=timeline_load module=persistence status=skip index={} reason=duplicate_id id={}",
                    index, record.id
                ),
                Err(err) => warn!(
                    "event=timeline_load module=persistence status=skip index={} reason=malformed error={}",
                    index, err
                ),
            }
        }

        let skipped = total - records.len();
        info!(
            "event=timeline_load module=persistence status=ok source=stored records={} skipped={}",
            records.len(),
            skipped
        );
        LoadOutcome {
            records,
            source: LoadSource::Stored,
            skipped,
        }
    }

    /// Replaces the stored blob with `records`.
    pub fn save(&self, records: &[TaskRecord]) -> Result<(), PersistError> {
        let blob = serde_json::to_string(records)?;
        match self.storage.set_item(STORAGE_KEY, &blob) {
            Ok(()) => {
                info!(
                    "event=timeline_save module=persistence status=ok records={} bytes={}",
                    records.len(),
                    blob.len()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=timeline_save module=persistence status=error records={} error={}",
                    records.len(),
                    err
                );
                Err(err.into())
            }
        }
    }

    fn seeded(&self) -> LoadOutcome {
        LoadOutcome {
            records: seed_records(self.seed_policy),
            source: LoadSource::Seeded,
            skipped: 0,
        }
    }
}

/// Built-in starting collection for `policy`.
pub fn seed_records(policy: SeedPolicy) -> Vec<TaskRecord> {
    match policy {
        SeedPolicy::Empty => Vec::new(),
        SeedPolicy::Samples => SAMPLE_SEEDS
            .iter()
            .filter_map(|seed| {
                let at = Utc
                    .with_ymd_and_hms(seed.year, seed.month, seed.day, 12, 0, 0)
                    .single()?;
                TaskRecord::with_id(
                    Uuid::from_u128(seed.id),
                    TaskKind::Accomplishment,
                    seed.title,
                    seed.description,
                    at,
                )
                .ok()
            })
            .collect(),
    }
}

struct SampleSeed {
    id: u128,
    title: &'static str,
    description: &'static str,
    year: i32,
    month: u32,
    day: u32,
}

const SAMPLE_SEEDS: &[SampleSeed] = &[
    SampleSeed {
        id: 0x5eed_0001,
        title: "Completed React Project",
        description: "Built a timeline component with TypeScript and Tailwind CSS",
        year: 2024,
        month: 1,
        day: 15,
    },
    SampleSeed {
        id: 0x5eed_0002,
        title: "Finished Advanced TypeScript Course",
        description: "Generics, utility types and advanced patterns",
        year: 2024,
        month: 1,
        day: 20,
    },
    SampleSeed {
        id: 0x5eed_0003,
        title: "Ran First 10K",
        description: "",
        year: 2024,
        month: 1,
        day: 25,
    },
];

#[cfg(test)]
mod tests {
    use super::{seed_records, LoadSource, SeedPolicy, TimelinePersistence, STORAGE_KEY};
    use crate::model::task::{TaskKind, TaskRecord};
    use crate::storage::{BlobStorage, MemoryBlobStorage};
    use chrono::{TimeZone, Utc};

    #[test]
    fn samples_are_three_completed_records_with_stable_ids() {
        let first = seed_records(SeedPolicy::Samples);
        let second = seed_records(SeedPolicy::Samples);
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|record| record.completed));
        assert_eq!(first, second);
        assert!(seed_records(SeedPolicy::Empty).is_empty());
    }

    #[test]
    fn load_without_blob_yields_seed() {
        let persistence = TimelinePersistence::new(MemoryBlobStorage::new(), SeedPolicy::Samples);
        let loaded = persistence.load();
        assert_eq!(loaded.source, LoadSource::Seeded);
        assert_eq!(loaded.records, seed_records(SeedPolicy::Samples));
    }

    #[test]
    fn save_then_load_restores_collection() {
        let persistence = TimelinePersistence::new(MemoryBlobStorage::new(), SeedPolicy::Empty);
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let records = vec![
            TaskRecord::new(TaskKind::Todo, "plan trip", "to Lisbon", at).unwrap(),
            TaskRecord::new(TaskKind::Accomplishment, "file taxes", "", at).unwrap(),
        ];

        persistence.save(&records).unwrap();
        let loaded = persistence.load();
        assert_eq!(loaded.source, LoadSource::Stored);
        assert_eq!(loaded.skipped, 0);
        assert_eq!(loaded.records, records);
    }

    #[test]
    fn unparseable_blob_falls_back_to_seed() {
        let storage = MemoryBlobStorage::new();
        storage.set_item(STORAGE_KEY, "{not json").unwrap();
        let persistence = TimelinePersistence::new(storage, SeedPolicy::Empty);

        let loaded = persistence.load();
        assert_eq!(loaded.source, LoadSource::Seeded);
        assert!(loaded.records.is_empty());
    }
}
