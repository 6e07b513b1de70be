//! Job result types

use crate::sink::WrittenFile;
use crate::types::JobState;
use serde::Serialize;

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_name: String,
    pub run_id: String,
    /// `database.table`
    pub table: String,
    pub destination: String,
    pub state: JobState,
    pub rows_read: usize,
    pub rows_written: usize,
    pub files: Vec<WrittenFile>,
    pub duration_ms: u64,
}

/// Outcome of a dry run
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub job_name: String,
    pub table: String,
    /// Where the catalog says the data lives
    pub location: String,
    pub rows: usize,
    /// Columns found in the source
    pub source_columns: Vec<String>,
    /// Output fields as `name: type`
    pub output_fields: Vec<String>,
}
