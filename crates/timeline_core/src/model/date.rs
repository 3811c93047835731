//! Timestamp helpers for the timeline.
//!
//! # Responsibility
//! - Parse user/file supplied timestamps into UTC values.
//! - Render machine-sortable and human-readable date strings.
//!
//! # Invariants
//! - Bare calendar dates map to midnight UTC of that day.
//! - Machine format is RFC 3339 with millisecond precision and `Z` suffix.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_DATE_FORMAT: &str = "%B %-d, %Y";

/// Input text is neither an RFC 3339 timestamp nor a `YYYY-MM-DD` date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParseError {
    pub input: String,
}

impl Display for DateParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid date `{}`; expected RFC 3339 timestamp or YYYY-MM-DD",
            self.input
        )
    }
}

impl Error for DateParseError {}

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD` calendar date.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DateParseError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, CALENDAR_DATE_FORMAT)
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DateParseError {
            input: trimmed.to_string(),
        })
}

/// Truncates a timestamp to its UTC calendar day.
pub fn day_of(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}

/// Renders `2024-01-15T09:30:00.000Z`.
pub fn format_machine_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Renders `January 15, 2024`.
pub fn format_display_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Renders `2024-01-15`.
pub fn format_calendar_date(day: NaiveDate) -> String {
    day.format(CALENDAR_DATE_FORMAT).to_string()
}
