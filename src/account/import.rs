// SPDX-License-Identifier: AGPL-3.0-or-later
//! Batch import coordinator
//!
//! Consumes a header-delimited CSV record source and drives the lifecycle
//! orchestrator once per record. Per-record failures are isolated: one
//! malformed or duplicate record never aborts the batch. The only fatal
//! condition is failure to open or read the source itself.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use super::directory::{Directory, PrivilegeAssignor};
use super::lifecycle::{FailureKind, Lifecycle, Operation, OperationResult, Outcome};
use crate::error::{Result, RosterError};

/// Columns every record source must carry; extra columns are ignored
const REQUIRED_COLUMNS: [&str; 3] = ["username", "role", "password"];

/// One row from the record source
///
/// The plaintext password is used once to drive a create call and dropped
/// with the record; it is never persisted or logged.
#[derive(Debug)]
struct ImportRecord {
    username: String,
    role: String,
    password: String,
}

/// Aggregate outcome of a batch import, in source order
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    /// Per-record results, ordered as the source was read
    pub results: Vec<OperationResult>,
    /// Records that fully succeeded
    pub succeeded: usize,
    /// Records skipped (e.g. the account already existed)
    pub skipped: usize,
    /// Records where some but not all steps completed
    pub partial: usize,
    /// Records that failed outright
    pub failed: usize,
}

impl BatchReport {
    fn push(&mut self, result: OperationResult) {
        match &result.outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::PartiallySucceeded { .. } => self.partial += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
        self.results.push(result);
    }

    /// Total number of records processed
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Whether any record failed or only partially succeeded
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.partial > 0
    }
}

/// Import accounts from a CSV record source
///
/// Required columns (by header name, case-insensitive): `username`, `role`,
/// `password`. Records are processed strictly in source order; the report
/// preserves that order. Returns an error only if the source cannot be
/// opened, its header cannot be read, or a required column is missing —
/// everything else is a per-record result.
pub fn import_users<S, P>(lifecycle: &mut Lifecycle<S>, path: P) -> Result<BatchReport>
where
    S: Directory + PrivilegeAssignor,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Err(RosterError::SourceNotFound {
            path: path.display().to_string(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut columns = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
        columns[slot] = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| RosterError::SourceMissingColumn {
                column: (*name).to_string(),
            })?;
    }
    let [username_col, role_col, password_col] = columns;

    let mut report = BatchReport::default();

    for (index, row) in reader.records().enumerate() {
        // Header is line 1; the first data row is line 2.
        let position = index + 2;

        let record = match row {
            Ok(record) => record,
            Err(e) => {
                report.push(row_failure(position, "", format!("malformed row: {e}")));
                continue;
            }
        };

        let record = match parse_record(&record, position, username_col, role_col, password_col) {
            Ok(record) => record,
            Err(result) => {
                report.push(result);
                continue;
            }
        };

        let result = lifecycle.create_user(&record.username, &record.role, &record.password);
        report.push(result);
        // `record` (and its plaintext password) is dropped here.
    }

    info!(
        source = %path.display(),
        total = report.total(),
        succeeded = report.succeeded,
        skipped = report.skipped,
        partial = report.partial,
        failed = report.failed,
        "Batch import completed"
    );

    Ok(report)
}

fn parse_record(
    record: &csv::StringRecord,
    position: usize,
    username_col: usize,
    role_col: usize,
    password_col: usize,
) -> std::result::Result<ImportRecord, OperationResult> {
    // Resolve the username first: failure results carry it, and must never
    // carry a value picked up from some other column (the password column
    // may come first in the source).
    let username = record.get(username_col).unwrap_or("").to_string();
    if username.is_empty() {
        return Err(row_failure(
            position,
            "",
            "missing value for column 'username'".to_string(),
        ));
    }
    let role = field(record, position, &username, role_col, "role")?;
    let password = field(record, position, &username, password_col, "password")?;
    Ok(ImportRecord {
        username,
        role,
        password,
    })
}

fn field(
    record: &csv::StringRecord,
    position: usize,
    username: &str,
    column: usize,
    name: &str,
) -> std::result::Result<String, OperationResult> {
    match record.get(column) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(row_failure(
            position,
            username,
            format!("missing value for column '{name}'"),
        )),
    }
}

fn row_failure(position: usize, username: &str, cause: String) -> OperationResult {
    OperationResult {
        username: username.to_string(),
        operation: Operation::Create,
        outcome: Outcome::Failed {
            kind: FailureKind::Validation,
            cause: cause.clone(),
        },
        message: format!("row {position}: {cause}"),
    }
}
