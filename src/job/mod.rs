//! Job driver
//!
//! Composes the three stages of a run: extract (catalog lookup and source
//! read), transform (field mapping) and load (Parquet upload). Every error
//! leaving a stage is tagged with that stage.
//!
//! # Example
//!
//! ```rust,ignore
//! use fraud_etl::config::JobConfig;
//! use fraud_etl::job::Job;
//!
//! let params = JobConfig::from_file("job.yaml")?.resolve()?;
//! let summary = Job::new(params)?.run().await?;
//! println!("wrote {} rows", summary.rows_written);
//! ```

mod types;

pub use types::{CheckReport, JobSummary};

use crate::catalog::{open_catalog, Catalog, TableDefinition};
use crate::config::JobParams;
use crate::error::{Error, Result};
use crate::mapping::FieldMapper;
use crate::sink::{SinkWriter, WrittenFile};
use crate::source::{SourceData, SourceReader};
use crate::storage::StorageLocation;
use crate::types::{JobState, Stage};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// A single run of the ETL job
pub struct Job {
    params: JobParams,
    catalog: Arc<dyn Catalog>,
    destination: StorageLocation,
    run_id: String,
    state: JobState,
}

impl Job {
    /// Open the catalog and destination named by the parameters
    pub fn new(params: JobParams) -> Result<Self> {
        let catalog = open_catalog(&params.catalog).map_err(|e| e.in_stage(Stage::Extract))?;
        let destination =
            StorageLocation::parse(&params.destination).map_err(|e| e.in_stage(Stage::Load))?;
        Ok(Self::with_parts(params, catalog, destination))
    }

    /// Build a job from an already opened catalog and destination
    pub fn with_parts(
        params: JobParams,
        catalog: Arc<dyn Catalog>,
        destination: StorageLocation,
    ) -> Self {
        Self {
            params,
            catalog,
            destination,
            run_id: Utc::now().timestamp_millis().to_string(),
            state: JobState::NotStarted,
        }
    }

    /// Override the run id used in output file names
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.params.job_name
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn params(&self) -> &JobParams {
        &self.params
    }

    fn reader(&self) -> SourceReader {
        SourceReader::new()
            .with_batch_size(self.params.source.batch_size)
            .with_infer_records(self.params.source.infer_records)
    }

    fn mapper(&self) -> FieldMapper {
        FieldMapper::new(self.params.mapping.clone())
            .with_policy(self.params.missing_field_policy)
            .with_parallelism(self.params.parallelism)
    }

    fn sink(&self) -> SinkWriter {
        SinkWriter::new(self.destination.clone())
            .with_config(self.params.output.writer_config())
            .with_max_rows_per_file(self.params.output.max_rows_per_file)
            .with_run_id(self.run_id.clone())
    }

    /// Run extract, transform and load once
    ///
    /// A job runs at most once. On failure the state becomes `Failed` and
    /// the stage-tagged error is returned; objects committed before a
    /// failing upload are not removed.
    pub async fn run(&mut self) -> Result<JobSummary> {
        if self.state != JobState::NotStarted {
            return Err(Error::config(format!(
                "Job '{}' has already been started (state: {:?})",
                self.params.job_name, self.state
            )));
        }

        self.state = JobState::Running;
        let started = Instant::now();
        tracing::info!(
            "Job '{}' started (run {}): {} -> {}",
            self.params.job_name,
            self.run_id,
            self.params.table,
            self.destination.url()
        );

        match self.execute().await {
            Ok((rows_read, rows_written, files)) => {
                self.state = JobState::Succeeded;
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::info!(
                    "Job '{}' succeeded: {} rows read, {} rows written to {} file(s) in {}ms",
                    self.params.job_name,
                    rows_read,
                    rows_written,
                    files.len(),
                    duration_ms
                );
                Ok(JobSummary {
                    job_name: self.params.job_name.clone(),
                    run_id: self.run_id.clone(),
                    table: self.params.table.to_string(),
                    destination: self.destination.url(),
                    state: self.state,
                    rows_read,
                    rows_written,
                    files,
                    duration_ms,
                })
            }
            Err(e) => {
                self.state = JobState::Failed;
                tracing::error!("Job '{}' failed: {}", self.params.job_name, e);
                Err(e)
            }
        }
    }

    async fn execute(&self) -> Result<(usize, usize, Vec<WrittenFile>)> {
        let (_, data) = self.extract().await.map_err(|e| e.in_stage(Stage::Extract))?;
        let rows_read = data.num_rows();

        let mapper = self.mapper();
        let mapped = self
            .transform(&mapper, data)
            .await
            .map_err(|e| e.in_stage(Stage::Transform))?;
        let rows_written: usize = mapped.iter().map(RecordBatch::num_rows).sum();

        let files = self
            .sink()
            .write(mapper.output_schema(), &mapped)
            .await
            .map_err(|e| e.in_stage(Stage::Load))?;

        Ok((rows_read, rows_written, files))
    }

    async fn extract(&self) -> Result<(TableDefinition, SourceData)> {
        tracing::debug!("Resolving {} in {} catalog", self.params.table, self.catalog.name());
        let table = self.catalog.get_table(&self.params.table).await?;
        let data = self.reader().read(&table).await?;
        Ok((table, data))
    }

    async fn transform(&self, mapper: &FieldMapper, data: SourceData) -> Result<Vec<RecordBatch>> {
        if let Some(schema) = data.schema() {
            mapper.validate_schema(&schema)?;
        }
        let mapped = mapper.map_batches(data.batches).await?;
        tracing::debug!("Mapped {} batches", mapped.len());
        Ok(mapped)
    }

    /// Extract and transform without writing any output
    pub async fn check(&self) -> Result<CheckReport> {
        let (table, data) = self.extract().await.map_err(|e| e.in_stage(Stage::Extract))?;
        let rows = data.num_rows();
        let source_columns = data
            .schema()
            .map(|s| s.fields().iter().map(|f| f.name().clone()).collect())
            .unwrap_or_default();

        let mapper = self.mapper();
        self.transform(&mapper, data)
            .await
            .map_err(|e| e.in_stage(Stage::Transform))?;

        tracing::info!("Check passed for {}: {} rows map cleanly", self.params.table, rows);

        Ok(CheckReport {
            job_name: self.params.job_name.clone(),
            table: self.params.table.to_string(),
            location: table.location.to_string(),
            rows,
            source_columns,
            output_fields: mapper
                .table()
                .entries()
                .iter()
                .map(|m| format!("{}: {}", m.target, m.target_type))
                .collect(),
        })
    }
}
