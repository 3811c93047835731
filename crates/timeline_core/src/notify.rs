//! User-facing notifications for timeline actions.
//!
//! # Responsibility
//! - Describe what changed after every mutating action in one value type.
//! - Deliver notices through an injected `Notifier` port.
//!
//! # Invariants
//! - Every successful mutation, export, import and failed import/save
//!   produces exactly one notice.
//! - Wording is cosmetic; the carried fields are the contract.

use crate::model::date::format_display_date;
use crate::model::task::TaskKind;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::cell::RefCell;
use std::fmt::{Display, Formatter};

/// One user-visible confirmation or error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Added { title: String, kind: TaskKind },
    Completed { title: String },
    Deleted { title: String },
    Rescheduled { title: String, date: DateTime<Utc> },
    Exported { file_name: String, count: usize },
    Imported {
        accepted: usize,
        skipped: usize,
        rejected_rows: usize,
    },
    ImportFailed { reason: String },
    SaveFailed { reason: String },
}

impl Notice {
    /// Whether this notice reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::ImportFailed { .. } | Self::SaveFailed { .. })
    }

    /// Stable event name used in log lines.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Added { .. } => "task_added",
            Self::Completed { .. } => "task_completed",
            Self::Deleted { .. } => "task_deleted",
            Self::Rescheduled { .. } => "task_rescheduled",
            Self::Exported { .. } => "csv_exported",
            Self::Imported { .. } => "csv_imported",
            Self::ImportFailed { .. } => "csv_import_failed",
            Self::SaveFailed { .. } => "save_failed",
        }
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added { title, kind } => match kind {
                TaskKind::Accomplishment => {
                    write!(f, "Accomplishment added: \"{title}\" is on your timeline.")
                }
                TaskKind::Todo => write!(f, "Todo added: \"{title}\" is on your timeline."),
            },
            Self::Completed { title } => {
                write!(f, "Congratulations! \"{title}\" moved to accomplishments.")
            }
            Self::Deleted { title } => write!(f, "Removed \"{title}\" from your timeline."),
            Self::Rescheduled { title, date } => write!(
                f,
                "\"{title}\" now dated {}.",
                format_display_date(*date)
            ),
            Self::Exported { file_name, count } => {
                write!(f, "Exported {count} item(s) to {file_name}.")
            }
            Self::Imported {
                accepted,
                skipped,
                rejected_rows: 0,
            } => write!(
                f,
                "Imported {accepted} item(s), skipped {skipped} duplicate(s)."
            ),
            Self::Imported {
                accepted,
                skipped,
                rejected_rows,
            } => write!(
                f,
                "Imported {accepted} item(s), skipped {skipped} duplicate(s) and {rejected_rows} unreadable row(s)."
            ),
            Self::ImportFailed { reason } => write!(f, "Import failed: {reason}"),
            Self::SaveFailed { reason } => write!(f, "Could not save your timeline: {reason}"),
        }
    }
}

/// Delivery port for notices.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log only. Titles are not logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        if notice.is_error() {
            warn!("event={} module=notify status=error", notice.event_name());
        } else {
            info!("event={} module=notify status=ok", notice.event_name());
        }
    }
}

/// Keeps delivered notices in order for later rendering.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: RefCell<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every notice delivered so far.
    pub fn drain(&self) -> Vec<Notice> {
        self.notices.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.notices.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.borrow().is_empty()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.borrow().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::{Notice, Notifier, RecordingNotifier};

    #[test]
    fn recording_notifier_keeps_order_and_drains() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notice::Deleted {
            title: "a".to_string(),
        });
        notifier.notify(Notice::Imported {
            accepted: 2,
            skipped: 1,
            rejected_rows: 0,
        });

        assert_eq!(notifier.len(), 2);
        let drained = notifier.drain();
        assert!(matches!(drained[0], Notice::Deleted { .. }));
        assert!(notifier.is_empty());
    }

    #[test]
    fn notice_messages_carry_counts_and_titles() {
        let imported = Notice::Imported {
            accepted: 3,
            skipped: 2,
            rejected_rows: 0,
        };
        assert!(imported.to_string().contains('3'));
        assert!(imported.to_string().contains('2'));

        let deleted = Notice::Deleted {
            title: "Run 5k".to_string(),
        };
        assert!(deleted.to_string().contains("Run 5k"));
        assert!(!deleted.is_error());
        assert!(Notice::SaveFailed {
            reason: "quota".to_string()
        }
        .is_error());
    }
}
