//! Catalog module
//!
//! Resolves `(database, table)` names to table locations and schemas.
//!
//! # Overview
//!
//! The catalog module provides:
//! - `Catalog` - lookup trait used by the job driver
//! - `FileCatalog` - YAML registry of tables in object storage
//! - `DuckDbCatalog` - schemas and tables inside a DuckDB file
//! - `open_catalog` - pick a backend from a path

mod duckdb;
mod file;
mod types;

pub(crate) use self::duckdb::open_read_only;
pub use self::duckdb::DuckDbCatalog;
pub use file::{CatalogDocument, DatabaseEntry, FileCatalog, TableEntry};
pub use types::{ColumnDef, CsvOptions, TableDefinition, TableLocation, TableRef};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// External metadata registry mapping names to datasets
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Resolve a table, failing with `NotFound` when the database or table
    /// is absent
    async fn get_table(&self, table: &TableRef) -> Result<TableDefinition>;

    /// List the tables registered in a database
    async fn list_tables(&self, database: &str) -> Result<Vec<String>>;
}

/// Open a catalog from a path
///
/// `.duckdb` and `.db` files open as a DuckDB catalog; anything else is
/// parsed as a YAML catalog document.
pub fn open_catalog(path: impl AsRef<Path>) -> Result<Arc<dyn Catalog>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("duckdb" | "db") => Ok(Arc::new(DuckDbCatalog::new(path)?)),
        _ => Ok(Arc::new(FileCatalog::from_file(path)?)),
    }
}
