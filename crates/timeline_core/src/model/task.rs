//! Task record domain model.
//!
//! # Responsibility
//! - Define the canonical record rendered on the timeline.
//! - Keep stored-blob compatibility rules next to the type they decode.
//!
//! # Invariants
//! - `id` is stable and never reused for another record.
//! - `title` is never blank once a record passed validation.
//! - `completed` is `true` exactly when `kind == TaskKind::Accomplishment`.
//!
//! # See also
//! - crate::persistence for the stored blob layout.

use crate::model::date::day_of;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every timeline record.
pub type TaskId = Uuid;

/// Namespace for ids derived from non-UUID identifiers found in stored blobs.
const STORED_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_0e2a_93d4_5b57_8a10_5e3c_7d29_f4b1);

/// Maps a stored identifier onto a `TaskId`.
///
/// UUID strings are taken as-is. Any other non-blank identifier, such as a
/// millisecond timestamp or `"1"`, maps to a UUID v5 of its text, so the same
/// stored id always yields the same `TaskId`. Blank text yields `None`.
pub fn task_id_from_stored(raw: &str) -> Option<TaskId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Some(
        Uuid::parse_str(raw)
            .unwrap_or_else(|_| Uuid::new_v5(&STORED_ID_NAMESPACE, raw.as_bytes())),
    )
}

/// Distinguishes finished work from pending work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Something already done; always `completed = true`.
    Accomplishment,
    /// Pending to-do; becomes an accomplishment once completed.
    Todo,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accomplishment => "accomplishment",
            Self::Todo => "todo",
        }
    }

    /// Completion flag implied by this kind.
    pub fn implies_completed(self) -> bool {
        matches!(self, Self::Accomplishment)
    }
}

/// Validation errors for record invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    BlankId,
    NilId,
    BlankTitle,
    StatusMismatch { kind: TaskKind, completed: bool },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "task id must not be blank"),
            Self::NilId => write!(f, "task id must not be nil"),
            Self::BlankTitle => write!(f, "task title must not be blank"),
            Self::StatusMismatch { kind, completed } => write!(
                f,
                "task of kind `{}` cannot have completed={completed}",
                kind.as_str()
            ),
        }
    }
}

impl Error for TaskValidationError {}

/// One entry on the timeline.
///
/// Serialized in camelCase with `completionDate` as an RFC 3339 string and
/// `kind` exposed as `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TaskRecordWire")]
pub struct TaskRecord {
    pub id: TaskId,
    pub title: String,
    /// Empty when the user gave no description.
    pub description: String,
    /// When the work was accomplished (or, for to-dos, when it was planned).
    pub completion_date: DateTime<Utc>,
    pub completed: bool,
    #[serde(rename = "type")]
    pub kind: TaskKind,
}

impl TaskRecord {
    /// Creates a validated record with a generated id.
    ///
    /// `completed` follows `kind`. Text is stored exactly as given.
    pub fn new(
        kind: TaskKind,
        title: impl AsRef<str>,
        description: impl AsRef<str>,
        completion_date: DateTime<Utc>,
    ) -> Result<Self, TaskValidationError> {
        Self::with_id(Uuid::new_v4(), kind, title, description, completion_date)
    }

    /// Creates a validated record with a caller-provided id.
    ///
    /// Used by seed data and tests where identity is fixed up front.
    pub fn with_id(
        id: TaskId,
        kind: TaskKind,
        title: impl AsRef<str>,
        description: impl AsRef<str>,
        completion_date: DateTime<Utc>,
    ) -> Result<Self, TaskValidationError> {
        let record = Self {
            id,
            title: title.as_ref().to_string(),
            description: description.as_ref().to_string(),
            completion_date,
            completed: kind.implies_completed(),
            kind,
        };
        record.validate()?;
        Ok(record)
    }

    /// Validates record invariants before it enters the store.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.is_nil() {
            return Err(TaskValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::BlankTitle);
        }
        if self.completed != self.kind.implies_completed() {
            return Err(TaskValidationError::StatusMismatch {
                kind: self.kind,
                completed: self.completed,
            });
        }
        Ok(())
    }

    /// Turns a pending to-do into an accomplishment finished at `at`.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.completed = true;
        self.kind = TaskKind::Accomplishment;
        self.completion_date = at;
    }

    pub fn is_pending(&self) -> bool {
        !self.completed
    }

    /// UTC calendar day of `completion_date`.
    pub fn day(&self) -> NaiveDate {
        day_of(self.completion_date)
    }

    /// Same title on the same calendar day. Time of day and surrounding
    /// whitespace in the title are ignored.
    pub fn duplicates(&self, other: &TaskRecord) -> bool {
        self.title.trim() == other.title.trim() && self.day() == other.day()
    }
}

/// Lenient stored shape: tolerates missing optional fields, the legacy
/// `date` key and non-UUID ids; ignores unknown fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecordWire {
    id: StoredId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(alias = "date")]
    completion_date: DateTime<Utc>,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(rename = "type", default)]
    kind: Option<TaskKind>,
}

/// Ids written by older versions: UUID strings, timestamp strings, or bare
/// numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredId {
    Text(String),
    Number(u64),
}

impl StoredId {
    fn to_task_id(&self) -> Option<TaskId> {
        match self {
            Self::Text(text) => task_id_from_stored(text),
            Self::Number(number) => task_id_from_stored(&number.to_string()),
        }
    }
}

impl TryFrom<TaskRecordWire> for TaskRecord {
    type Error = TaskValidationError;

    fn try_from(value: TaskRecordWire) -> Result<Self, Self::Error> {
        let id = value.id.to_task_id().ok_or(TaskValidationError::BlankId)?;
        let (kind, completed) = match (value.kind, value.completed) {
            (Some(kind), Some(completed)) => (kind, completed),
            (Some(kind), None) => (kind, kind.implies_completed()),
            (None, Some(true)) | (None, None) => (TaskKind::Accomplishment, true),
            (None, Some(false)) => (TaskKind::Todo, false),
        };

        let record = Self {
            id,
            title: value.title,
            description: value.description.unwrap_or_default(),
            completion_date: value.completion_date,
            completed,
            kind,
        };
        record.validate()?;
        Ok(record)
    }
}
