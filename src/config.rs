//! Job configuration
//!
//! A job is configured from a YAML file, environment variables and CLI
//! flags, in increasing order of precedence. `JobConfig` is the raw,
//! partially filled document; `JobParams` is the validated result every
//! stage runs from.

use crate::catalog::TableRef;
use crate::error::{Error, Result};
use crate::mapping::MappingTable;
use crate::sink::{ParquetCompression, ParquetWriterConfig, DEFAULT_MAX_ROWS_PER_FILE};
use crate::source::{DEFAULT_BATCH_SIZE, DEFAULT_INFER_RECORDS};
use crate::storage::validate_bucket_name;
use crate::types::MissingFieldPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Raw Config
// ============================================================================

/// Job configuration as loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job name used in logs and summaries
    #[serde(default = "default_job_name")]
    pub job_name: String,

    /// Logical database in the catalog
    #[serde(default)]
    pub database: Option<String>,

    /// Table within the database
    #[serde(default)]
    pub table: Option<String>,

    /// Output bucket; output goes to `s3://<bucket>/<prefix>`
    #[serde(default)]
    pub destination_bucket: Option<String>,

    #[serde(default)]
    pub destination_prefix: Option<String>,

    /// Full destination URL, replacing bucket and prefix (local runs)
    #[serde(default)]
    pub destination_url: Option<String>,

    /// Catalog file (YAML or DuckDB)
    #[serde(default)]
    pub catalog: Option<PathBuf>,

    /// Mapping literals; the fraud scoring mapping when absent
    #[serde(default)]
    pub mapping: Option<Vec<String>>,

    #[serde(default)]
    pub missing_field_policy: MissingFieldPolicy,

    /// Batches mapped concurrently
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    #[serde(default)]
    pub source: SourceSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

fn default_job_name() -> String {
    "fraud-etl".to_string()
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job_name: default_job_name(),
            database: None,
            table: None,
            destination_bucket: None,
            destination_prefix: None,
            destination_url: None,
            catalog: None,
            mapping: None,
            missing_field_policy: MissingFieldPolicy::default(),
            parallelism: default_parallelism(),
            source: SourceSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

/// Source read settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Rows per decoded batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Rows sampled for schema inference
    #[serde(default = "default_infer_records")]
    pub infer_records: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_infer_records() -> usize {
    DEFAULT_INFER_RECORDS
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            infer_records: default_infer_records(),
        }
    }
}

/// Parquet output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub compression: ParquetCompression,

    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,

    #[serde(default = "default_max_rows_per_file")]
    pub max_rows_per_file: usize,
}

fn default_row_group_size() -> usize {
    1024 * 1024
}

fn default_max_rows_per_file() -> usize {
    DEFAULT_MAX_ROWS_PER_FILE
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            compression: ParquetCompression::default(),
            row_group_size: default_row_group_size(),
            max_rows_per_file: default_max_rows_per_file(),
        }
    }
}

impl OutputSettings {
    /// Parquet writer configuration for these settings
    pub fn writer_config(&self) -> ParquetWriterConfig {
        ParquetWriterConfig::new()
            .with_compression(self.compression)
            .with_row_group_size(self.row_group_size)
    }
}

/// Values that replace config file entries when set
#[derive(Debug, Clone, Default)]
pub struct JobOverrides {
    pub job_name: Option<String>,
    pub database: Option<String>,
    pub table: Option<String>,
    pub destination_bucket: Option<String>,
    pub destination_prefix: Option<String>,
    pub destination_url: Option<String>,
    pub catalog: Option<PathBuf>,
    pub mapping: Option<Vec<String>>,
    pub missing_field_policy: Option<MissingFieldPolicy>,
    pub parallelism: Option<usize>,
    pub compression: Option<ParquetCompression>,
    pub max_rows_per_file: Option<usize>,
}

impl JobConfig {
    /// Load a config from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file '{}': {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a config from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse job config YAML: {e}")))
    }

    /// Apply overrides on top of this config
    #[must_use]
    pub fn with_overrides(mut self, overrides: JobOverrides) -> Self {
        if let Some(v) = overrides.job_name {
            self.job_name = v;
        }
        if let Some(v) = overrides.database {
            self.database = Some(v);
        }
        if let Some(v) = overrides.table {
            self.table = Some(v);
        }
        if let Some(v) = overrides.destination_bucket {
            self.destination_bucket = Some(v);
        }
        if let Some(v) = overrides.destination_prefix {
            self.destination_prefix = Some(v);
        }
        if let Some(v) = overrides.destination_url {
            self.destination_url = Some(v);
        }
        if let Some(v) = overrides.catalog {
            self.catalog = Some(v);
        }
        if let Some(v) = overrides.mapping {
            self.mapping = Some(v);
        }
        if let Some(v) = overrides.missing_field_policy {
            self.missing_field_policy = v;
        }
        if let Some(v) = overrides.parallelism {
            self.parallelism = v;
        }
        if let Some(v) = overrides.compression {
            self.output.compression = v;
        }
        if let Some(v) = overrides.max_rows_per_file {
            self.output.max_rows_per_file = v;
        }
        self
    }

    /// Effective mapping table
    pub fn mapping_table(&self) -> Result<MappingTable> {
        match &self.mapping {
            Some(literals) => MappingTable::parse(literals),
            None => Ok(MappingTable::fraud_scoring()),
        }
    }

    /// Catalog path, required by every command that resolves tables
    pub fn catalog_path(&self) -> Result<PathBuf> {
        self.catalog
            .clone()
            .ok_or_else(|| Error::missing_parameter("catalog"))
    }

    /// Destination URL built from the bucket and prefix
    pub fn destination(&self) -> Result<String> {
        if let Some(url) = &self.destination_url {
            if url.trim().is_empty() {
                return Err(Error::config("destination_url cannot be empty"));
            }
            return Ok(url.clone());
        }

        let bucket = required(self.destination_bucket.as_ref(), "destination_bucket")?;
        validate_bucket_name(bucket)?;

        let prefix = self
            .destination_prefix
            .as_deref()
            .unwrap_or_default()
            .trim_matches('/');
        if prefix.is_empty() {
            Ok(format!("s3://{bucket}/"))
        } else {
            Ok(format!("s3://{bucket}/{prefix}/"))
        }
    }

    /// Validate and resolve into runnable job parameters
    pub fn resolve(self) -> Result<JobParams> {
        if self.job_name.trim().is_empty() {
            return Err(Error::config("job_name cannot be empty"));
        }
        if self.parallelism == 0 {
            return Err(Error::config("parallelism must be at least 1"));
        }
        if self.output.max_rows_per_file == 0 {
            return Err(Error::config("output.max_rows_per_file must be at least 1"));
        }

        let database = required(self.database.as_ref(), "database")?;
        let table = required(self.table.as_ref(), "table")?;

        Ok(JobParams {
            table: TableRef::new(database, table),
            destination: self.destination()?,
            catalog: self.catalog_path()?,
            mapping: self.mapping_table()?,
            job_name: self.job_name,
            missing_field_policy: self.missing_field_policy,
            parallelism: self.parallelism,
            source: self.source,
            output: self.output,
        })
    }
}

fn required<'a>(value: Option<&'a String>, field: &str) -> Result<&'a str> {
    match value.map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::missing_parameter(field)),
    }
}

// ============================================================================
// Resolved Parameters
// ============================================================================

/// Validated job parameters
#[derive(Debug, Clone)]
pub struct JobParams {
    pub job_name: String,
    pub table: TableRef,
    /// Destination URL, e.g. `s3://fraud-output/`
    pub destination: String,
    pub catalog: PathBuf,
    pub mapping: MappingTable,
    pub missing_field_policy: MissingFieldPolicy,
    pub parallelism: usize,
    pub source: SourceSettings,
    pub output: OutputSettings,
}
