//! Sink module
//!
//! Parquet encoding and upload of mapped batches.
//!
//! # Overview
//!
//! This module provides:
//! - `ParquetWriterConfig` - compression, row group and encoding options
//! - `encode_parquet` - in-memory Parquet encoding
//! - `SinkWriter` - splits rows into files and puts them under the
//!   destination prefix

mod uploader;
mod writer;

pub use uploader::{SinkWriter, WrittenFile, DEFAULT_MAX_ROWS_PER_FILE};
pub use writer::{encode_parquet, ParquetCompression, ParquetWriterConfig};

#[cfg(test)]
mod tests;
