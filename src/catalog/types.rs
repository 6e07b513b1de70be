//! Catalog types

use crate::error::{Error, Result};
use crate::types::{DataFormat, FieldType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Table Reference
// ============================================================================

/// Catalog lookup key: a table inside a logical database
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Logical database name
    pub database: String,
    /// Table name within the database
    pub table: String,
}

impl TableRef {
    /// Create a new table reference
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

// ============================================================================
// Column Definitions
// ============================================================================

/// A column as registered in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Type name as the catalog spells it (e.g. `bigint`, `double`)
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnDef {
    /// Create a column definition
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    /// Parse the registered type
    pub fn field_type(&self) -> Result<FieldType> {
        self.data_type.parse().map_err(|e: String| {
            Error::config(format!("Column '{}' has unsupported type: {e}", self.name))
        })
    }
}

// ============================================================================
// CSV Options
// ============================================================================

/// Parsing options for delimited text tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// Whether the first line holds column names
    #[serde(default)]
    pub header: bool,
    /// Field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ','
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            header: false,
            delimiter: default_delimiter(),
        }
    }
}

impl CsvOptions {
    /// Delimiter as a single byte
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .map_err(|_| Error::config(format!("CSV delimiter '{}' is not ASCII", self.delimiter)))
    }
}

// ============================================================================
// Table Definition
// ============================================================================

/// Where a table's rows live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLocation {
    /// Data files in object storage or on the local filesystem
    Storage {
        /// Object or prefix URL
        url: String,
        /// File format of every object under the location
        format: DataFormat,
        /// Options for CSV objects
        csv: CsvOptions,
    },
    /// A table inside a DuckDB database file
    DuckDb {
        /// Database file
        path: PathBuf,
        /// Schema holding the table
        schema: String,
        /// Table name
        table: String,
    },
}

impl fmt::Display for TableLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableLocation::Storage { url, format, .. } => write!(f, "{url} ({format})"),
            TableLocation::DuckDb {
                path,
                schema,
                table,
            } => write!(f, "duckdb://{}#{schema}.{table}", path.display()),
        }
    }
}

/// A resolved catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// The key this entry was resolved from
    pub table: TableRef,
    /// Where the rows live
    pub location: TableLocation,
    /// Registered columns, empty when the schema is inferred at read time
    pub columns: Vec<ColumnDef>,
}
