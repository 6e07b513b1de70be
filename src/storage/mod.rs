//! Storage module
//!
//! Object storage access shared by the source reader and the sink writer.
//!
//! # Overview
//!
//! This module provides:
//! - `StorageLocation` - a store plus a base prefix parsed from a URL
//! - Bucket name validation for S3 destinations
//!
//! Supported URLs: `s3://`, `r2://`, `gs://`, `az://`, `file://` and plain
//! local paths. Credentials are resolved from the environment by the
//! `object_store` builders.

mod location;

pub use location::{is_data_object, validate_bucket_name, StorageLocation};
