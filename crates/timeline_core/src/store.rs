//! Timeline store: the canonical task collection and its mutations.
//!
//! # Responsibility
//! - Own the ordered collection exclusively; hand out read-only views.
//! - Apply add/complete/delete/reschedule/import atomically.
//! - Write the whole collection through to persistence after each mutation.
//! - Emit one notice per user action.
//!
//! # Invariants
//! - Ids are unique across the collection at all times.
//! - A rejected operation leaves the collection untouched.
//! - New records and accepted import batches are prepended.
//! - A failed save keeps the in-memory mutation and reports `SaveFailed`.

use crate::clock::Clock;
use crate::csv::{self, CsvError};
use crate::model::task::{TaskId, TaskKind, TaskRecord};
use crate::notify::{Notice, Notifier};
use crate::persistence::{LoadSource, TimelinePersistence};
use crate::projection::{project, TimelineView};
use crate::storage::BlobStorage;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Soft failures of store operations. None of them change the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Title was empty after trimming.
    EmptyTitle,
    NotFound(TaskId),
    AlreadyCompleted(TaskId),
    /// Import text could not be decoded; nothing was merged.
    Import(CsvError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::AlreadyCompleted(id) => write!(f, "task already completed: {id}"),
            Self::Import(err) => write!(f, "import failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Import(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CsvError> for StoreError {
    fn from(value: CsvError) -> Self {
        Self::Import(value)
    }
}

/// Request model for adding one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub kind: TaskKind,
}

impl NewTask {
    pub fn accomplishment(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            kind: TaskKind::Accomplishment,
        }
    }

    pub fn todo(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            kind: TaskKind::Todo,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Counts reported by an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub accepted: usize,
    /// Candidates dropped as same-title-same-day duplicates.
    pub skipped: usize,
    /// Rows or candidates dropped as unreadable/invalid.
    pub rejected: usize,
}

/// Export payload ready to be written to disk or offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub contents: String,
    pub count: usize,
}

/// Store facade over injected persistence, notifier and clock ports.
pub struct TimelineStore<S: BlobStorage, N: Notifier, C: Clock> {
    records: Vec<TaskRecord>,
    persistence: TimelinePersistence<S>,
    notifier: N,
    clock: C,
    unsaved: bool,
}

impl<S: BlobStorage, N: Notifier, C: Clock> TimelineStore<S, N, C> {
    /// Loads the collection once and takes ownership of it.
    pub fn open(persistence: TimelinePersistence<S>, notifier: N, clock: C) -> Self {
        let loaded = persistence.load();
        info!(
            "event=store_open module=store status=ok source={} records={} skipped={}",
            match loaded.source {
                LoadSource::Stored => "stored",
                LoadSource::Seeded => "seed",
            },
            loaded.records.len(),
            loaded.skipped
        );
        Self {
            records: loaded.records,
            persistence,
            notifier,
            clock,
            unsaved: false,
        }
    }

    /// Collection in storage order (most recently inserted first).
    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when the last write-through failed.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Display projection of the current collection.
    pub fn view(&self) -> TimelineView<'_> {
        project(&self.records)
    }

    /// Adds a record stamped with the current time.
    ///
    /// # Errors
    /// - `EmptyTitle` when the trimmed title is empty; nothing changes.
    pub fn add(&mut self, request: NewTask) -> StoreResult<TaskId> {
        let mut record = TaskRecord::new(
            request.kind,
            request.title,
            request.description,
            self.clock.now(),
        )
        // A fresh id and kind-derived status leave the title as the only
        // field that can fail validation.
        .map_err(|_| StoreError::EmptyTitle)?;
        self.ensure_unique_id(&mut record);

        let id = record.id;
        let notice = Notice::Added {
            title: record.title.clone(),
            kind: record.kind,
        };
        self.records.insert(0, record);
        info!("event=task_add module=store status=ok id={id}");

        self.notifier.notify(notice);
        self.write_through();
        Ok(id)
    }

    /// Completes a pending record, re-stamping its date to now.
    ///
    /// # Errors
    /// - `NotFound` for unknown ids.
    /// - `AlreadyCompleted` when the record is already done; the date is
    ///   not re-stamped a second time.
    pub fn complete(&mut self, id: TaskId) -> StoreResult<()> {
        let now = self.clock.now();
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if record.completed {
            return Err(StoreError::AlreadyCompleted(id));
        }

        record.mark_completed(now);
        let notice = Notice::Completed {
            title: record.title.clone(),
        };
        info!("event=task_complete module=store status=ok id={id}");

        self.notifier.notify(notice);
        self.write_through();
        Ok(())
    }

    /// Removes a record and returns it.
    ///
    /// # Errors
    /// - `NotFound` for unknown ids; nothing changes.
    pub fn delete(&mut self, id: TaskId) -> StoreResult<TaskRecord> {
        let index = self.index_of(id).ok_or(StoreError::NotFound(id))?;
        let removed = self.records.remove(index);
        info!("event=task_delete module=store status=ok id={id}");

        self.notifier.notify(Notice::Deleted {
            title: removed.title.clone(),
        });
        self.write_through();
        Ok(removed)
    }

    /// Moves a record to `date`. No other field changes.
    pub fn reschedule(&mut self, id: TaskId, date: DateTime<Utc>) -> StoreResult<()> {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::NotFound(id))?;
        record.completion_date = date;
        let notice = Notice::Rescheduled {
            title: record.title.clone(),
            date,
        };
        info!("event=task_reschedule module=store status=ok id={id}");

        self.notifier.notify(notice);
        self.write_through();
        Ok(())
    }

    /// Merges externally supplied candidates.
    ///
    /// A candidate is skipped when an existing record, or an earlier
    /// candidate of the same batch, has the same title on the same day.
    /// Accepted candidates keep batch order and go before existing records.
    pub fn import_batch(&mut self, candidates: Vec<TaskRecord>) -> ImportSummary {
        let summary = self.merge_batch(candidates, 0);
        self.finish_import(summary);
        summary
    }

    /// Decodes CSV text fully, then merges it through `import_batch` rules.
    ///
    /// # Errors
    /// - `Import` when the text is structurally unreadable; the collection
    ///   is untouched and an `ImportFailed` notice is emitted.
    pub fn import_csv(&mut self, text: &str) -> StoreResult<ImportSummary> {
        let report = match csv::decode(text) {
            Ok(report) => report,
            Err(err) => {
                warn!("event=csv_import module=store status=error error={err}");
                self.notifier.notify(Notice::ImportFailed {
                    reason: err.to_string(),
                });
                return Err(err.into());
            }
        };

        let summary = self.merge_batch(report.candidates, report.rejected.len());
        self.finish_import(summary);
        Ok(summary)
    }

    /// Reports an import that failed before decoding (e.g. unreadable file).
    pub fn report_import_failure(&self, reason: impl Into<String>) {
        self.notifier.notify(Notice::ImportFailed {
            reason: reason.into(),
        });
    }

    /// Encodes the collection in storage order, named after today's date.
    pub fn export_csv(&self) -> CsvExport {
        let export = CsvExport {
            file_name: csv::export_file_name(self.clock.now().date_naive()),
            contents: csv::encode(&self.records),
            count: self.records.len(),
        };
        info!(
            "event=csv_export module=store status=ok rows={}",
            export.count
        );
        self.notifier.notify(Notice::Exported {
            file_name: export.file_name.clone(),
            count: export.count,
        });
        export
    }

    fn merge_batch(&mut self, candidates: Vec<TaskRecord>, rejected: usize) -> ImportSummary {
        let mut summary = ImportSummary {
            rejected,
            ..ImportSummary::default()
        };
        let mut accepted: Vec<TaskRecord> = Vec::new();

        for mut candidate in candidates {
            if candidate.validate().is_err() {
                summary.rejected += 1;
                continue;
            }
            let is_duplicate = self
                .records
                .iter()
                .chain(accepted.iter())
                .any(|existing| existing.duplicates(&candidate));
            if is_duplicate {
                summary.skipped += 1;
                continue;
            }
            while self.index_of(candidate.id).is_some()
                || accepted.iter().any(|record| record.id == candidate.id)
            {
                candidate.id = Uuid::new_v4();
            }
            accepted.push(candidate);
        }

        summary.accepted = accepted.len();
        if !accepted.is_empty() {
            accepted.append(&mut self.records);
            self.records = accepted;
        }

        info!(
            "event=import_batch module=store status=ok accepted={} skipped={} rejected={}",
            summary.accepted, summary.skipped, summary.rejected
        );
        summary
    }

    fn finish_import(&mut self, summary: ImportSummary) {
        self.notifier.notify(Notice::Imported {
            accepted: summary.accepted,
            skipped: summary.skipped,
            rejected_rows: summary.rejected,
        });
        if summary.accepted > 0 {
            self.write_through();
        }
    }

    fn index_of(&self, id: TaskId) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    fn ensure_unique_id(&self, record: &mut TaskRecord) {
        while self.index_of(record.id).is_some() {
            record.id = Uuid::new_v4();
        }
    }

    fn write_through(&mut self) {
        match self.persistence.save(&self.records) {
            Ok(()) => self.unsaved = false,
            Err(err) => {
                self.unsaved = true;
                self.notifier.notify(Notice::SaveFailed {
                    reason: err.to_string(),
                });
            }
        }
    }
}
