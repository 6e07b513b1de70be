// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # fraud-etl
//!
//! A single ETL job for scored card transactions: look up a cataloged
//! table, project, rename and cast six columns, and write the result to
//! object storage as Parquet.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fraud_etl::config::{JobConfig, JobOverrides};
//! use fraud_etl::job::Job;
//!
//! #[tokio::main]
//! async fn main() -> fraud_etl::Result<()> {
//!     let params = JobConfig::from_file("job.yaml")?
//!         .with_overrides(JobOverrides {
//!             destination_bucket: Some("fraud-output".into()),
//!             ..Default::default()
//!         })
//!         .resolve()?;
//!
//!     let summary = Job::new(params)?.run().await?;
//!     println!("{} rows -> {} files", summary.rows_written, summary.files.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                           Job                                 │
//! │  run() → extract → transform → load      check() → dry run    │
//! └───────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┼───────────────┬────────────────┐
//! │   Catalog    │    Source     │    Mapping    │     Sink       │
//! ├──────────────┼───────────────┼───────────────┼────────────────┤
//! │ YAML file    │ CSV           │ Rename        │ Parquet encode │
//! │ DuckDB       │ JSON          │ Cast          │ File splitting │
//! │              │ Parquet       │ Null policy   │ Object upload  │
//! │              │ DuckDB table  │               │                │
//! └──────────────┴───────────────┴───────────────┴────────────────┘
//!                                │
//!                 Storage (S3, R2, GCS, Azure, local)
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Object storage locations
pub mod storage;

/// Table catalogs
pub mod catalog;

/// Source table reader
pub mod source;

/// Field mapping
pub mod mapping;

/// Parquet sink
pub mod sink;

/// Job configuration
pub mod config;

/// Job driver
pub mod job;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use job::{Job, JobSummary};
pub use mapping::{FieldMapper, MappingTable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
