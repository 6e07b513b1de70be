//! Source module
//!
//! Reads cataloged tables into Arrow RecordBatches.
//!
//! # Overview
//!
//! This module provides:
//! - `SourceReader` - reads Parquet, CSV and JSON objects or DuckDB tables
//! - Schema helpers for declared and inferred schemas
//!
//! Headerless CSV columns are named `col0..colN`, matching how catalog
//! crawlers register delimited files without a header row.

mod reader;
mod schema;

pub use reader::{SourceData, SourceReader, DEFAULT_BATCH_SIZE, DEFAULT_INFER_RECORDS};
pub use schema::{declared_schema, infer_csv_schema, merge_schemas, positional_name};
