use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;

use crate::models::{Application, Status};

/// Headers a payload must carry for any import to be attempted.
pub const REQUIRED_HEADERS: [&str; 4] = ["company", "position", "appliedDate", "status"];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("missing required header: {0}")]
    MissingHeader(String),
    #[error("CSV is empty or has only a header row")]
    Empty,
}

/// Why a data row was not turned into a record.
#[derive(Debug, Clone)]
pub struct SkippedRow {
    /// 1-indexed data row number (the header row is row 0).
    pub row: usize,
    pub reason: String,
}

/// What an import produced: the accepted records plus a note for every row
/// that was dropped. Lenient callers report the skips and move on; strict
/// callers refuse the whole batch when any row was dropped.
#[derive(Debug)]
pub struct ImportOutcome {
    pub applications: Vec<Application>,
    pub skipped: Vec<SkippedRow>,
}

/// Parse a CSV payload (comma-separated, double-quote-escapable, header row
/// first) into validated records.
///
/// A missing required header fails the whole import. Individual rows
/// missing a required value, or with an unparseable applied date, are
/// skipped and recorded. Unknown statuses coerce to `Applied`. Each record
/// gets an `imported-<batch>-<row>` id so its provenance stays inspectable.
pub fn parse_csv(text: &str, batch: &str) -> Result<ImportOutcome, ImportError> {
    let lines: Vec<&str> = text
        .split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.len() < 2 {
        return Err(ImportError::Empty);
    }

    let header: Vec<String> = split_csv_line(lines[0])
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    for required in REQUIRED_HEADERS {
        if !header.iter().any(|h| h == required) {
            return Err(ImportError::MissingHeader(required.to_string()));
        }
    }

    let mut applications = Vec::new();
    let mut skipped = Vec::new();

    for (row, line) in lines[1..].iter().enumerate() {
        let row = row + 1;
        let fields = split_csv_line(line);
        let value = |name: &str| -> &str {
            header
                .iter()
                .position(|h| h == name)
                .and_then(|i| fields.get(i))
                .map(|f| f.trim())
                .unwrap_or("")
        };

        let company = value("company");
        let position = value("position");
        let applied = value("appliedDate");
        let status = value("status");
        if company.is_empty() || position.is_empty() || applied.is_empty() || status.is_empty() {
            skipped.push(SkippedRow {
                row,
                reason: "missing company, position, appliedDate, or status".to_string(),
            });
            continue;
        }

        let Some(applied_date) = parse_date(applied) else {
            skipped.push(SkippedRow {
                row,
                reason: format!("unparseable appliedDate '{applied}'"),
            });
            continue;
        };

        applications.push(Application {
            id: format!("imported-{batch}-{row}"),
            company: company.to_string(),
            position: position.to_string(),
            applied_date,
            status: Status::parse_or_applied(status),
            source: non_empty(value("source")),
            job_link: non_empty(value("jobLink")),
            notes: non_empty(value("notes")),
            reminder_date: parse_date(value("reminderDate")),
            reminder_note: non_empty(value("reminderNote")),
        });
    }

    Ok(ImportOutcome {
        applications,
        skipped,
    })
}

/// Drop imported rows whose identity key already exists in the collection.
pub fn dedupe_against(existing: &[Application], imported: Vec<Application>) -> Vec<Application> {
    let known: HashSet<String> = existing.iter().map(|a| a.identity_key()).collect();
    imported
        .into_iter()
        .filter(|app| !known.contains(&app.identity_key()))
        .collect()
}

/// Split one CSV line, honoring double-quoted fields. A doubled quote
/// inside a quoted field is a literal quote.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
