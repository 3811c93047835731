//! Core logic for the personal accomplishment timeline.
//!
//! The store owns the task collection, writes it through to a string-keyed
//! blob storage on every mutation, and exposes a sorted read-only view. CSV
//! export/import round-trips through the store's merge rules.

pub mod clock;
pub mod csv;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod persistence;
pub mod projection;
pub mod storage;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use csv::{CsvDecodeReport, CsvError, RejectedRow, RowIssue};
pub use logging::{default_log_level, init_logging, LogConfig, LoggingError};
pub use model::date::{parse_timestamp, DateParseError};
pub use model::task::{task_id_from_stored, TaskId, TaskKind, TaskRecord, TaskValidationError};
pub use notify::{LogNotifier, Notice, Notifier, RecordingNotifier};
pub use persistence::{
    seed_records, LoadOutcome, LoadSource, PersistError, SeedPolicy, TimelinePersistence,
    STORAGE_KEY,
};
pub use projection::{project, EntryStatus, TimelineEntry, TimelineView};
pub use storage::{BlobStorage, MemoryBlobStorage, SqliteBlobStorage, StorageError, StorageResult};
pub use store::{CsvExport, ImportSummary, NewTask, StoreError, StoreResult, TimelineStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
