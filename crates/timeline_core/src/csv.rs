//! CSV interchange codec for the timeline.
//!
//! # Responsibility
//! - Encode the collection as a two-column `Title,Date` file.
//! - Decode such files into import candidates without touching the store.
//!
//! # Invariants
//! - Every data field is wrapped in double quotes; embedded quotes are doubled.
//! - Dates are written as millisecond RFC 3339 UTC timestamps.
//! - Decode parses every row before returning; nothing is merged row by row.
//! - Row-level problems skip that row; only empty input or a file with no
//!   usable row fails the whole decode.
//! - Quoted fields keep their text exactly, line breaks included.

use crate::model::date::{format_calendar_date, format_machine_timestamp, parse_timestamp};
use crate::model::task::{TaskKind, TaskRecord};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const HEADER: [&str; 2] = ["Title", "Date"];
const DELIMITER: char = ',';
const QUOTE: char = '"';
const BOM: char = '\u{feff}';

/// Whole-file decode failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvError {
    /// Input has no non-blank line at all.
    Empty,
    /// Data rows exist but none of them could be parsed.
    NoValidRows { rejected: usize },
}

impl Display for CsvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "file is empty"),
            Self::NoValidRows { rejected } => {
                write!(f, "none of the {rejected} row(s) could be read")
            }
        }
    }
}

impl Error for CsvError {}

/// Reason a single data row was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIssue {
    UnterminatedQuote,
    FieldCount(usize),
    BlankTitle,
    InvalidDate(String),
}

impl Display for RowIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnterminatedQuote => write!(f, "unterminated quoted field"),
            Self::FieldCount(count) => write!(f, "expected 2 fields, found {count}"),
            Self::BlankTitle => write!(f, "title is blank"),
            Self::InvalidDate(value) => write!(f, "invalid date `{value}`"),
        }
    }
}

/// A skipped row with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub line: usize,
    pub issue: RowIssue,
}

/// Successful decode: candidates in file order plus skipped rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDecodeReport {
    pub candidates: Vec<TaskRecord>,
    pub rejected: Vec<RejectedRow>,
}

/// File name for an export made on `day`: `timeline-YYYY-MM-DD.csv`.
pub fn export_file_name(day: NaiveDate) -> String {
    format!("timeline-{}.csv", format_calendar_date(day))
}

/// Encodes records in the given order under a `Title,Date` header.
pub fn encode(records: &[TaskRecord]) -> String {
    let mut out = String::with_capacity(16 + records.len() * 48);
    out.push_str(&HEADER.join(","));
    out.push('\n');

    for record in records {
        out.push_str(&quote_field(&record.title));
        out.push(DELIMITER);
        out.push_str(&quote_field(&format_machine_timestamp(
            record.completion_date,
        )));
        out.push('\n');
    }

    debug!(
        "event=csv_encode module=csv status=ok rows={} bytes={}",
        records.len(),
        out.len()
    );
    out
}

/// Decodes CSV text into accomplishment candidates with fresh ids.
///
/// The first non-blank row is the header and is skipped whatever it says.
/// Accepts `\n` and `\r\n` line endings, line breaks inside quoted fields
/// and an optional UTF-8 BOM.
pub fn decode(text: &str) -> Result<CsvDecodeReport, CsvError> {
    let mut rows = split_rows(text.trim_start_matches(BOM))
        .into_iter()
        .filter(|(_, row)| !row.trim().is_empty());

    let (_, header_row) = rows.next().ok_or(CsvError::Empty)?;
    if !is_header(&header_row) {
        warn!("event=csv_decode module=csv status=warn reason=unexpected_header");
    }

    let mut candidates = Vec::new();
    let mut rejected = Vec::new();
    for (line, row) in rows {
        match parse_candidate(&row) {
            Ok(record) => candidates.push(record),
            Err(issue) => {
                debug!("event=csv_decode module=csv status=skip line={line} reason={issue}");
                rejected.push(RejectedRow { line, issue });
            }
        }
    }

    if candidates.is_empty() && !rejected.is_empty() {
        return Err(CsvError::NoValidRows {
            rejected: rejected.len(),
        });
    }

    info!(
        "event=csv_decode module=csv status=ok candidates={} rejected={}",
        candidates.len(),
        rejected.len()
    );
    Ok(CsvDecodeReport {
        candidates,
        rejected,
    })
}

/// Splits text into rows tagged with their 1-based starting line.
///
/// Line breaks inside quotes stay in the row. A `\r` directly before a row
/// break is dropped.
fn split_rows(text: &str) -> Vec<(usize, String)> {
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut row_start = 1;
    let mut line = 1;
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            QUOTE => {
                in_quotes = !in_quotes;
                row.push(c);
            }
            '\n' => {
                line += 1;
                if in_quotes {
                    row.push(c);
                } else {
                    rows.push((row_start, std::mem::take(&mut row)));
                    row_start = line;
                }
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            _ => row.push(c),
        }
    }
    if !row.is_empty() {
        rows.push((row_start, row));
    }
    rows
}

fn quote_field(value: &str) -> String {
    let escaped = value.replace(QUOTE, "\"\"");
    format!("{QUOTE}{escaped}{QUOTE}")
}

fn is_header(line: &str) -> bool {
    match split_fields(line) {
        Ok(fields) => {
            fields.len() == HEADER.len()
                && fields
                    .iter()
                    .zip(HEADER)
                    .all(|(field, expected)| field.eq_ignore_ascii_case(expected))
        }
        Err(_) => false,
    }
}

fn parse_candidate(line: &str) -> Result<TaskRecord, RowIssue> {
    let fields = split_fields(line)?;
    let [title, date] = fields.as_slice() else {
        return Err(RowIssue::FieldCount(fields.len()));
    };

    if title.trim().is_empty() {
        return Err(RowIssue::BlankTitle);
    }
    let completion_date = parse_timestamp(date)
        .map_err(|_| RowIssue::InvalidDate(date.trim().to_string()))?;

    TaskRecord::new(TaskKind::Accomplishment, title, "", completion_date)
        .map_err(|_| RowIssue::BlankTitle)
}

/// Splits one row into fields, unwrapping one layer of quotes.
///
/// Unquoted fields are trimmed; quoted fields are kept verbatim. Inside
/// quotes, `""` is a literal quote and delimiters and line breaks are kept.
/// Stray text between a closing quote and the next delimiter is dropped.
fn split_fields(row: &str) -> Result<Vec<String>, RowIssue> {
    let mut fields = Vec::new();
    let mut chars = row.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut field = String::new();
        let quoted = chars.peek() == Some(&QUOTE);
        if quoted {
            chars.next();
            loop {
                match chars.next() {
                    Some(QUOTE) => {
                        if chars.peek() == Some(&QUOTE) {
                            chars.next();
                            field.push(QUOTE);
                        } else {
                            break;
                        }
                    }
                    Some(c) => field.push(c),
                    None => return Err(RowIssue::UnterminatedQuote),
                }
            }
        }

        let mut reached_delimiter = false;
        for c in chars.by_ref() {
            if c == DELIMITER {
                reached_delimiter = true;
                break;
            }
            if !quoted {
                field.push(c);
            }
        }

        if quoted {
            fields.push(field);
        } else {
            fields.push(field.trim().to_string());
        }
        if !reached_delimiter {
            return Ok(fields);
        }
    }
}
