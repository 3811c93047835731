//! Read-only display projection of the timeline.
//!
//! # Invariants
//! - Entries are ordered by `completion_date` descending.
//! - Equal dates keep collection order (stable sort).
//! - An empty collection projects to `TimelineView::Empty`, never to an
//!   empty entry list.

use crate::model::date::format_display_date;
use crate::model::task::{TaskKind, TaskRecord};

/// Badge shown next to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Accomplished,
    Pending,
}

impl EntryStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Accomplished => "Accomplished",
            Self::Pending => "Pending",
        }
    }
}

/// One display row borrowing its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry<'a> {
    pub record: &'a TaskRecord,
    pub status: EntryStatus,
    /// Long form date, e.g. `January 15, 2024`.
    pub display_date: String,
    /// Only pending to-dos offer a complete action.
    pub can_complete: bool,
}

/// Display-ready timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineView<'a> {
    Empty,
    Entries(Vec<TimelineEntry<'a>>),
}

impl<'a> TimelineView<'a> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn entries(&self) -> &[TimelineEntry<'a>] {
        match self {
            Self::Empty => &[],
            Self::Entries(entries) => entries,
        }
    }
}

/// Derives the display sequence from `records` without mutating them.
pub fn project(records: &[TaskRecord]) -> TimelineView<'_> {
    if records.is_empty() {
        return TimelineView::Empty;
    }

    let mut ordered: Vec<&TaskRecord> = records.iter().collect();
    ordered.sort_by(|a, b| b.completion_date.cmp(&a.completion_date));

    TimelineView::Entries(ordered.into_iter().map(to_entry).collect())
}

fn to_entry(record: &TaskRecord) -> TimelineEntry<'_> {
    let status = if record.completed {
        EntryStatus::Accomplished
    } else {
        EntryStatus::Pending
    };
    TimelineEntry {
        record,
        status,
        display_date: format_display_date(record.completion_date),
        can_complete: !record.completed && record.kind == TaskKind::Todo,
    }
}
