//! YAML file catalog
//!
//! ```yaml
//! databases:
//!   frauddb:
//!     tables:
//!       transactions:
//!         location: s3://raw-bucket/transactions/
//!         format: csv
//!         csv:
//!           header: false
//!         columns:
//!           - name: col0
//!             type: bigint
//! ```

use crate::catalog::types::{ColumnDef, CsvOptions, TableDefinition, TableLocation, TableRef};
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::types::DataFormat;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level catalog document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Databases by name
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseEntry>,
}

/// A logical database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseEntry {
    #[serde(default)]
    pub description: Option<String>,

    /// Tables by name
    #[serde(default)]
    pub tables: BTreeMap<String, TableEntry>,
}

/// A registered table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEntry {
    /// Object, prefix or local path holding the data
    pub location: String,

    #[serde(default)]
    pub format: DataFormat,

    #[serde(default)]
    pub csv: CsvOptions,

    #[serde(default)]
    pub columns: Vec<ColumnDef>,
}

/// Catalog backed by a YAML document
#[derive(Debug, Clone)]
pub struct FileCatalog {
    document: CatalogDocument,
    /// Directory relative local locations are resolved against
    base_dir: Option<PathBuf>,
}

impl FileCatalog {
    /// Load a catalog from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::from_read_io(e, &format!("catalog file {}", path.display()))
        })?;

        let mut catalog = Self::from_yaml(&content)?;
        catalog.base_dir = path.parent().map(Path::to_path_buf);
        Ok(catalog)
    }

    /// Parse a catalog from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: CatalogDocument = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse catalog YAML: {e}")))?;
        validate_document(&document)?;

        Ok(Self {
            document,
            base_dir: None,
        })
    }

    /// Access the parsed document
    pub fn document(&self) -> &CatalogDocument {
        &self.document
    }

    fn database(&self, name: &str) -> Result<&DatabaseEntry> {
        self.document
            .databases
            .get(name)
            .ok_or_else(|| Error::not_found(format!("database '{name}'")))
    }

    /// Resolve a relative local location against the catalog directory
    fn resolve_location(&self, location: &str) -> String {
        if location.contains("://") || Path::new(location).is_absolute() {
            return location.to_string();
        }
        match &self.base_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(location).display().to_string(),
            _ => location.to_string(),
        }
    }
}

fn validate_document(document: &CatalogDocument) -> Result<()> {
    for (db_name, db) in &document.databases {
        for (table_name, table) in &db.tables {
            if table.location.trim().is_empty() {
                return Err(Error::config(format!(
                    "Table '{db_name}.{table_name}' has an empty location"
                )));
            }
            for column in &table.columns {
                column.field_type()?;
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Catalog for FileCatalog {
    fn name(&self) -> &str {
        "file"
    }

    async fn get_table(&self, table: &TableRef) -> Result<TableDefinition> {
        let entry = self
            .database(&table.database)?
            .tables
            .get(&table.table)
            .ok_or_else(|| Error::not_found(format!("table '{table}'")))?;

        Ok(TableDefinition {
            table: table.clone(),
            location: TableLocation::Storage {
                url: self.resolve_location(&entry.location),
                format: entry.format,
                csv: entry.csv.clone(),
            },
            columns: entry.columns.clone(),
        })
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        Ok(self.database(database)?.tables.keys().cloned().collect())
    }
}
