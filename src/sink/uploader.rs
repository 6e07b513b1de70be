//! Sink writer
//!
//! Writes mapped batches as Parquet objects under the destination prefix.

use crate::error::Result;
use crate::sink::writer::{encode_parquet, ParquetWriterConfig};
use crate::storage::StorageLocation;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use serde::Serialize;

/// Default upper bound of rows in one output file
pub const DEFAULT_MAX_ROWS_PER_FILE: usize = 1_000_000;

/// An object committed by the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    /// Full URL of the object
    pub url: String,
    /// Rows in the file
    pub rows: usize,
    /// Encoded size in bytes
    pub bytes: usize,
}

/// Writes Parquet output to a storage location
#[derive(Debug, Clone)]
pub struct SinkWriter {
    destination: StorageLocation,
    config: ParquetWriterConfig,
    max_rows_per_file: usize,
    run_id: String,
}

impl SinkWriter {
    /// Create a sink for a destination, with a run id taken from the clock
    pub fn new(destination: StorageLocation) -> Self {
        Self {
            destination,
            config: ParquetWriterConfig::default(),
            max_rows_per_file: DEFAULT_MAX_ROWS_PER_FILE,
            run_id: Utc::now().timestamp_millis().to_string(),
        }
    }

    /// Set the Parquet writer configuration
    #[must_use]
    pub fn with_config(mut self, config: ParquetWriterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum rows per output file
    #[must_use]
    pub fn with_max_rows_per_file(mut self, rows: usize) -> Self {
        self.max_rows_per_file = rows.max(1);
        self
    }

    /// Set the run id used in file names
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// The destination
    pub fn destination(&self) -> &StorageLocation {
        &self.destination
    }

    /// Object name of the `index`-th output file
    ///
    /// Format: `run-{run_id}-part-r-{index:05}.{codec}.parquet`
    pub fn file_name(&self, index: usize) -> String {
        format!(
            "run-{}-part-r-{index:05}.{}.parquet",
            self.run_id,
            self.config.compression().file_tag()
        )
    }

    /// Group rows into files of at most `max_rows_per_file` rows
    pub fn plan_files(&self, batches: &[RecordBatch]) -> Vec<Vec<RecordBatch>> {
        let max = self.max_rows_per_file;
        let mut files = Vec::new();
        let mut current = Vec::new();
        let mut current_rows = 0;

        for batch in batches {
            let mut offset = 0;
            while offset < batch.num_rows() {
                let take = (max - current_rows).min(batch.num_rows() - offset);
                current.push(batch.slice(offset, take));
                current_rows += take;
                offset += take;

                if current_rows == max {
                    files.push(std::mem::take(&mut current));
                    current_rows = 0;
                }
            }
        }

        if !current.is_empty() {
            files.push(current);
        }
        files
    }

    /// Encode and commit every output file
    ///
    /// All files are encoded before the first put. Each put is atomic per
    /// object; objects committed before a failing put are left in place.
    /// Empty input commits nothing.
    pub async fn write(&self, schema: SchemaRef, batches: &[RecordBatch]) -> Result<Vec<WrittenFile>> {
        let plan = self.plan_files(batches);
        if plan.is_empty() {
            tracing::warn!("No rows to write to {}", self.destination.url());
            return Ok(Vec::new());
        }

        let mut encoded = Vec::with_capacity(plan.len());
        for (index, file_batches) in plan.iter().enumerate() {
            let rows = file_batches.iter().map(RecordBatch::num_rows).sum::<usize>();
            let data = encode_parquet(schema.clone(), file_batches, &self.config)?;
            encoded.push((self.file_name(index), rows, data));
        }

        let mut written = Vec::with_capacity(encoded.len());
        for (name, rows, data) in encoded {
            let bytes = data.len();
            let url = self.destination.put(&name, data).await?;
            tracing::info!("Wrote {} rows ({} bytes) to {}", rows, bytes, url);
            written.push(WrittenFile { url, rows, bytes });
        }

        Ok(written)
    }
}
