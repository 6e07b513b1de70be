//! DuckDB-backed catalog
//!
//! A DuckDB database file acts as the catalog: the logical database is a
//! DuckDB schema and the table is a table inside it. The file is only ever
//! opened read-only.

use crate::catalog::types::{ColumnDef, TableDefinition, TableLocation, TableRef};
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use async_trait::async_trait;
use duckdb::{params, AccessMode, Config, Connection};
use std::path::{Path, PathBuf};

/// Catalog reading schemas and tables from a DuckDB file
#[derive(Debug, Clone)]
pub struct DuckDbCatalog {
    path: PathBuf,
}

impl DuckDbCatalog {
    /// Create a catalog over an existing DuckDB file
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        // Surface missing files and permission problems before DuckDB does
        std::fs::File::open(&path)
            .map_err(|e| Error::from_read_io(e, &format!("catalog {}", path.display())))?;
        Ok(Self { path })
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a blocking closure against a read-only connection
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open_read_only(&path)?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Other(format!("DuckDB task failed: {e}")))?
    }
}

/// Open a DuckDB file without write access
pub(crate) fn open_read_only(path: &Path) -> Result<Connection> {
    let config = Config::default().access_mode(AccessMode::ReadOnly)?;
    Connection::open_with_flags(path, config)
        .map_err(|e| Error::from_read_duckdb(e, &format!("duckdb file {}", path.display())))
}

fn schema_exists(conn: &Connection, schema: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM information_schema.schemata WHERE schema_name = ?",
        params![schema],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[async_trait]
impl Catalog for DuckDbCatalog {
    fn name(&self) -> &str {
        "duckdb"
    }

    async fn get_table(&self, table: &TableRef) -> Result<TableDefinition> {
        let path = self.path.clone();
        let table_ref = table.clone();

        self.with_connection(move |conn| {
            if !schema_exists(conn, &table_ref.database)? {
                return Err(Error::not_found(format!(
                    "database '{}'",
                    table_ref.database
                )));
            }

            let mut stmt = conn.prepare(
                "SELECT column_name, data_type
                 FROM information_schema.columns
                 WHERE table_schema = ? AND table_name = ?
                 ORDER BY ordinal_position",
            )?;
            let columns: Vec<ColumnDef> = stmt
                .query_map(params![table_ref.database, table_ref.table], |row| {
                    Ok(ColumnDef::new(
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                    ))
                })?
                .collect::<std::result::Result<_, _>>()?;

            if columns.is_empty() {
                return Err(Error::not_found(format!("table '{table_ref}'")));
            }

            Ok(TableDefinition {
                location: TableLocation::DuckDb {
                    path,
                    schema: table_ref.database.clone(),
                    table: table_ref.table.clone(),
                },
                table: table_ref,
                columns,
            })
        })
        .await
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let database = database.to_string();

        self.with_connection(move |conn| {
            if !schema_exists(conn, &database)? {
                return Err(Error::not_found(format!("database '{database}'")));
            }

            let mut stmt = conn.prepare(
                "SELECT table_name FROM information_schema.tables
                 WHERE table_schema = ?
                 ORDER BY table_name",
            )?;
            let tables = stmt
                .query_map(params![database], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(tables)
        })
        .await
    }
}
