//! Timeline domain model.
//!
//! # Responsibility
//! - Define the task record persisted and rendered by the timeline.
//! - Own timestamp parsing/formatting shared by storage, CSV and views.
//!
//! # Invariants
//! - Every record is identified by a stable `TaskId`.
//! - All timestamps are UTC; day granularity means the UTC calendar day.

pub mod date;
pub mod task;
