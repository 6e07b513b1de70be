//! Common types used throughout fraud-etl
//!
//! This module contains shared type definitions used across the
//! catalog, mapping, sink and job modules.

use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Field Types
// ============================================================================

/// Logical column type as written in catalogs and mapping tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 64-bit signed integer
    Long,
    /// 32-bit signed integer
    Int,
    /// 64-bit float
    Double,
    /// 32-bit float
    Float,
    /// UTF-8 string
    String,
    /// Boolean
    Boolean,
}

impl FieldType {
    /// Arrow type this logical type is stored as
    pub fn data_type(self) -> DataType {
        match self {
            FieldType::Long => DataType::Int64,
            FieldType::Int => DataType::Int32,
            FieldType::Double => DataType::Float64,
            FieldType::Float => DataType::Float32,
            FieldType::String => DataType::Utf8,
            FieldType::Boolean => DataType::Boolean,
        }
    }

    /// Name used in mapping literals
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Long => "long",
            FieldType::Int => "int",
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" | "bigint" | "int64" => Ok(FieldType::Long),
            "int" | "integer" | "int32" => Ok(FieldType::Int),
            "double" | "float64" => Ok(FieldType::Double),
            "float" | "float32" => Ok(FieldType::Float),
            "string" | "varchar" | "utf8" => Ok(FieldType::String),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            other => Err(format!("unknown field type '{other}'")),
        }
    }
}

// ============================================================================
// Data Format
// ============================================================================

/// On-storage format of a cataloged table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Delimited text
    #[default]
    Csv,
    /// Newline-delimited JSON
    Json,
    /// Apache Parquet
    Parquet,
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::Csv => f.write_str("csv"),
            DataFormat::Json => f.write_str("json"),
            DataFormat::Parquet => f.write_str("parquet"),
        }
    }
}

// ============================================================================
// Missing Field Policy
// ============================================================================

/// What the mapper does with a null or absent value in a mapped source column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingFieldPolicy {
    /// Fail the record with a schema mismatch
    #[default]
    Fail,
    /// Emit a null in the output field
    Null,
}

// ============================================================================
// Job Stages and State
// ============================================================================

/// Pipeline stage, used to tag errors and log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Catalog lookup and source read
    Extract,
    /// Field mapping
    Transform,
    /// Parquet encoding and upload
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extract => f.write_str("extract"),
            Stage::Transform => f.write_str("transform"),
            Stage::Load => f.write_str("load"),
        }
    }
}

/// Lifecycle of a single job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    /// Whether the run has finished, successfully or not
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}
