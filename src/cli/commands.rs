//! CLI commands and argument parsing

use crate::config::JobOverrides;
use crate::sink::ParquetCompression;
use crate::types::MissingFieldPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Fraud scoring ETL job
#[derive(Parser, Debug)]
#[command(name = "fraud-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Job configuration file (YAML)
    #[arg(short = 'C', long, global = true, env = "FRAUD_ETL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Catalog file (YAML, or a .duckdb database)
    #[arg(long, global = true, env = "FRAUD_ETL_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read the table, map it and write Parquet to the destination
    Run(JobArgs),

    /// Read and map the table without writing anything
    Check(JobArgs),

    /// Print the effective mapping table
    Mapping {
        /// Mapping literal, e.g. `col0:long->timestamp:long` (repeatable)
        #[arg(long = "mapping", env = "FRAUD_ETL_MAPPING", value_delimiter = ',')]
        mapping: Option<Vec<String>>,

        /// Missing field policy used for output nullability
        #[arg(long = "missing_field_policy", env = "FRAUD_ETL_MISSING_FIELD_POLICY")]
        missing_field_policy: Option<MissingFieldPolicy>,
    },

    /// List the tables of a catalog database
    Tables {
        /// Catalog database
        #[arg(long, env = "FRAUD_ETL_DATABASE")]
        database: Option<String>,
    },
}

/// Job parameters
///
/// Long names follow the managed job convention (`--JOB_NAME`,
/// `--destination_bucket`) so existing invocations keep working.
#[derive(Args, Debug, Clone, Default)]
pub struct JobArgs {
    /// Job name used in logs and summaries
    #[arg(long = "JOB_NAME", env = "FRAUD_ETL_JOB_NAME")]
    pub job_name: Option<String>,

    /// Catalog database
    #[arg(long, env = "FRAUD_ETL_DATABASE")]
    pub database: Option<String>,

    /// Table within the database
    #[arg(long, env = "FRAUD_ETL_TABLE")]
    pub table: Option<String>,

    /// Output bucket
    #[arg(long = "destination_bucket", env = "FRAUD_ETL_DESTINATION_BUCKET")]
    pub destination_bucket: Option<String>,

    /// Key prefix inside the output bucket
    #[arg(long = "destination_prefix", env = "FRAUD_ETL_DESTINATION_PREFIX")]
    pub destination_prefix: Option<String>,

    /// Full destination URL or local path, replacing bucket and prefix
    /// Supports: /path, s3://bucket/path, r2://bucket/path, gs://bucket/path, az://container/path
    #[arg(long = "destination_url", env = "FRAUD_ETL_DESTINATION_URL")]
    pub destination_url: Option<String>,

    /// Mapping literal, e.g. `col0:long->timestamp:long` (repeatable)
    #[arg(long = "mapping", env = "FRAUD_ETL_MAPPING", value_delimiter = ',')]
    pub mapping: Option<Vec<String>>,

    /// What to do with null or absent mapped values
    #[arg(long = "missing_field_policy", env = "FRAUD_ETL_MISSING_FIELD_POLICY")]
    pub missing_field_policy: Option<MissingFieldPolicy>,

    /// Batches mapped concurrently
    #[arg(long, env = "FRAUD_ETL_PARALLELISM")]
    pub parallelism: Option<usize>,

    /// Parquet compression codec
    #[arg(long, env = "FRAUD_ETL_COMPRESSION")]
    pub compression: Option<ParquetCompression>,

    /// Maximum rows per output file
    #[arg(long = "max_rows_per_file", env = "FRAUD_ETL_MAX_ROWS_PER_FILE")]
    pub max_rows_per_file: Option<usize>,
}

impl JobArgs {
    /// Overrides to apply on top of the config file
    pub fn overrides(&self, catalog: Option<PathBuf>) -> JobOverrides {
        JobOverrides {
            job_name: self.job_name.clone(),
            database: self.database.clone(),
            table: self.table.clone(),
            destination_bucket: self.destination_bucket.clone(),
            destination_prefix: self.destination_prefix.clone(),
            destination_url: self.destination_url.clone(),
            catalog,
            mapping: self.mapping.clone(),
            missing_field_policy: self.missing_field_policy,
            parallelism: self.parallelism,
            compression: self.compression,
            max_rows_per_file: self.max_rows_per_file,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
