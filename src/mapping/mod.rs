//! Mapping module
//!
//! Applies a fixed mapping table to every record: project the mapped
//! columns, rename them and cast them to their declared types.
//!
//! # Overview
//!
//! The mapping module provides:
//! - `FieldMapping` / `MappingTable` - the table, parseable from
//!   `col0:long->timestamp:long` literals
//! - `FieldMapper` - per-batch transform with a missing-field policy
//!
//! One input record always yields exactly one output record.

mod mapper;
mod types;

pub use mapper::FieldMapper;
pub use types::{FieldMapping, MappingTable};
