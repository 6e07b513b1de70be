//! Source reader
//!
//! Reads a resolved catalog table into Arrow RecordBatches.

use crate::catalog::{open_read_only, CsvOptions, TableDefinition, TableLocation};
use crate::error::{Error, Result};
use crate::source::schema::{declared_schema, infer_csv_schema, infer_json_schema, merge_schemas};
use crate::storage::StorageLocation;
use crate::types::DataFormat;
use arrow::array::{Array, ArrayRef};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

/// Default rows per decoded batch
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Default rows sampled for schema inference
pub const DEFAULT_INFER_RECORDS: usize = 1000;

/// Rows read from a source table
#[derive(Debug, Clone)]
pub struct SourceData {
    /// Decoded batches in object order
    pub batches: Vec<RecordBatch>,
    /// Number of objects (or DuckDB tables) read
    pub objects: usize,
}

impl SourceData {
    /// Total rows across all batches
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Schema of the first batch, if any
    pub fn schema(&self) -> Option<SchemaRef> {
        self.batches.first().map(RecordBatch::schema)
    }
}

/// Reads catalog tables
#[derive(Debug, Clone)]
pub struct SourceReader {
    batch_size: usize,
    infer_records: usize,
}

impl Default for SourceReader {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            infer_records: DEFAULT_INFER_RECORDS,
        }
    }
}

impl SourceReader {
    /// Create a reader with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set rows per decoded batch
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set rows sampled for schema inference
    #[must_use]
    pub fn with_infer_records(mut self, records: usize) -> Self {
        self.infer_records = records.max(1);
        self
    }

    /// Read every row of a table
    pub async fn read(&self, table: &TableDefinition) -> Result<SourceData> {
        tracing::info!("Reading {} from {}", table.table, table.location);

        let data = match &table.location {
            TableLocation::Storage { url, format, csv } => {
                let location = StorageLocation::parse(url)?;
                self.read_storage(&location, *format, csv, table).await?
            }
            TableLocation::DuckDb {
                path,
                schema,
                table: name,
            } => self.read_duckdb(path.clone(), schema.clone(), name.clone()).await?,
        };

        tracing::info!(
            "Read {} rows in {} batches from {} object(s)",
            data.num_rows(),
            data.batches.len(),
            data.objects
        );
        Ok(data)
    }

    /// Read every data object under a storage location
    pub async fn read_storage(
        &self,
        location: &StorageLocation,
        format: DataFormat,
        csv: &CsvOptions,
        table: &TableDefinition,
    ) -> Result<SourceData> {
        let objects = location.data_objects().await?;

        let mut contents = Vec::with_capacity(objects.len());
        for meta in &objects {
            tracing::debug!("Fetching {} ({} bytes)", meta.location, meta.size);
            contents.push(location.get(&meta.location).await?);
        }

        let batches = match format {
            DataFormat::Parquet => self.decode_parquet(&contents)?,
            DataFormat::Csv => self.decode_csv(&contents, csv, table)?,
            DataFormat::Json => self.decode_json(&contents, table)?,
        };

        Ok(SourceData {
            batches,
            objects: objects.len(),
        })
    }

    fn decode_parquet(&self, contents: &[Bytes]) -> Result<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        for data in contents {
            let reader = ParquetRecordBatchReaderBuilder::try_new(data.clone())?
                .with_batch_size(self.batch_size)
                .build()?;
            for batch in reader {
                batches.push(batch?);
            }
        }
        Ok(batches)
    }

    fn decode_csv(
        &self,
        contents: &[Bytes],
        options: &CsvOptions,
        table: &TableDefinition,
    ) -> Result<Vec<RecordBatch>> {
        let delimiter = options.delimiter_byte()?;

        let schema = if table.columns.is_empty() {
            let mut merged: Option<Schema> = None;
            for data in contents {
                let inferred = infer_csv_schema(
                    Cursor::new(data.as_ref()),
                    options.header,
                    delimiter,
                    self.infer_records,
                )?;
                merged = Some(match merged {
                    Some(existing) => merge_schemas(&existing, &inferred),
                    None => inferred,
                });
            }
            merged.unwrap_or_else(Schema::empty)
        } else {
            declared_schema(&table.columns)?
        };
        let schema: SchemaRef = Arc::new(schema);
        let text = text_schema(&schema);

        let mut batches = Vec::new();
        let mut rows = 0;
        for data in contents {
            let reader = arrow::csv::ReaderBuilder::new(text.clone())
                .with_header(options.header)
                .with_delimiter(delimiter)
                .with_truncated_rows(true)
                .with_batch_size(self.batch_size)
                .build(Cursor::new(data.clone()))?;
            for batch in reader {
                let batch = parse_text_batch(&batch?, &schema, rows)?;
                rows += batch.num_rows();
                batches.push(batch);
            }
        }
        Ok(batches)
    }

    fn decode_json(&self, contents: &[Bytes], table: &TableDefinition) -> Result<Vec<RecordBatch>> {
        let schema = if table.columns.is_empty() {
            let mut merged: Option<Schema> = None;
            for data in contents {
                let inferred = infer_json_schema(Cursor::new(data.as_ref()), self.infer_records)?;
                merged = Some(match merged {
                    Some(existing) => merge_schemas(&existing, &inferred),
                    None => inferred,
                });
            }
            merged.unwrap_or_else(Schema::empty)
        } else {
            declared_schema(&table.columns)?
        };
        let schema: SchemaRef = Arc::new(schema);
        let text = text_schema(&schema);

        let mut batches = Vec::new();
        let mut rows = 0;
        for data in contents {
            let reader = arrow::json::ReaderBuilder::new(text.clone())
                .with_coerce_primitive(true)
                .with_batch_size(self.batch_size)
                .build(Cursor::new(data.clone()))?;
            for batch in reader {
                let batch = parse_text_batch(&batch?, &schema, rows)?;
                rows += batch.num_rows();
                batches.push(batch);
            }
        }
        Ok(batches)
    }

    /// Read a table out of a DuckDB file
    async fn read_duckdb(&self, path: PathBuf, schema: String, table: String) -> Result<SourceData> {
        tokio::task::spawn_blocking(move || {
            let conn = open_read_only(&path)?;
            let query = format!(
                "SELECT * FROM {}.{}",
                quote_identifier(&schema),
                quote_identifier(&table)
            );
            tracing::debug!("Executing query: {}", query);

            let what = format!("table '{schema}.{table}' in {}", path.display());
            let mut stmt = conn
                .prepare(&query)
                .map_err(|e| Error::from_read_duckdb(e, &what))?;
            let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();

            Ok(SourceData {
                batches,
                objects: 1,
            })
        })
        .await
        .map_err(|e| Error::Other(format!("DuckDB read task failed: {e}")))?
    }
}

/// Same field names with scalar columns decoded as text
///
/// Text files are decoded as strings first so a value that does not parse
/// under its column type can be reported with its field and row.
fn text_schema(schema: &Schema) -> SchemaRef {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            if is_scalar(f.data_type()) {
                Field::new(f.name(), DataType::Utf8, true)
            } else {
                f.as_ref().clone()
            }
        })
        .collect();
    Arc::new(Schema::new(fields))
}

fn is_scalar(data_type: &DataType) -> bool {
    data_type.is_numeric() || matches!(data_type, DataType::Boolean | DataType::Utf8)
}

/// Parse a text-decoded batch into the typed schema
fn parse_text_batch(
    batch: &RecordBatch,
    schema: &SchemaRef,
    row_offset: usize,
) -> Result<RecordBatch> {
    let options = CastOptions {
        safe: true,
        ..Default::default()
    };

    let columns = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, text)| {
            if text.data_type() == field.data_type() {
                return Ok(text.clone());
            }
            let parsed = cast_with_options(text, field.data_type(), &options)?;
            if parsed.null_count() > text.null_count() {
                let first_bad = (0..text.len()).find(|&i| text.is_valid(i) && parsed.is_null(i));
                if let Some(row) = first_bad {
                    let value = array_value_to_string(text.as_ref(), row).unwrap_or_default();
                    return Err(Error::record_mismatch(
                        field.name(),
                        row_offset + row,
                        format!("value '{value}' is not a valid {}", field.data_type()),
                    ));
                }
            }
            Ok(parsed)
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

/// Quote a SQL identifier for DuckDB
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
