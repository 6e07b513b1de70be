//! Source schema helpers

use crate::catalog::ColumnDef;
use crate::error::Result;
use arrow::datatypes::{DataType, Field, Schema};
use std::io::{BufRead, Read};

/// Build an Arrow schema from catalog column definitions
pub fn declared_schema(columns: &[ColumnDef]) -> Result<Schema> {
    let fields = columns
        .iter()
        .map(|c| Ok(Field::new(&c.name, c.field_type()?.data_type(), true)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Schema::new(fields))
}

/// Name used for the column at `index` in headerless text files
pub fn positional_name(index: usize) -> String {
    format!("col{index}")
}

/// Infer a CSV schema, naming headerless columns `col0..colN`
pub fn infer_csv_schema<R: Read>(
    reader: R,
    header: bool,
    delimiter: u8,
    max_records: usize,
) -> Result<Schema> {
    let format = arrow::csv::reader::Format::default()
        .with_header(header)
        .with_delimiter(delimiter)
        .with_truncated_rows(true);
    let (schema, _) = format.infer_schema(reader, Some(max_records))?;

    if header {
        return Ok(schema);
    }

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| Field::new(positional_name(i), f.data_type().clone(), true))
        .collect();
    Ok(Schema::new(fields))
}

/// Infer a newline-delimited JSON schema
pub fn infer_json_schema<R: BufRead>(reader: R, max_records: usize) -> Result<Schema> {
    let (schema, _) = arrow::json::reader::infer_json_schema(reader, Some(max_records))?;
    Ok(schema)
}

/// Merge two schemas, keeping first-seen field order
///
/// Conflicting types widen: null yields to anything, integers to floats,
/// everything else to strings.
pub fn merge_schemas(left: &Schema, right: &Schema) -> Schema {
    let mut fields: Vec<Field> = left.fields().iter().map(|f| f.as_ref().clone()).collect();

    for field in right.fields() {
        match fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => {
                let merged = merge_types(existing.data_type(), field.data_type());
                *existing = Field::new(
                    existing.name(),
                    merged,
                    existing.is_nullable() || field.is_nullable(),
                );
            }
            None => fields.push(field.as_ref().clone()),
        }
    }

    Schema::new(fields)
}

fn merge_types(left: &DataType, right: &DataType) -> DataType {
    match (left, right) {
        (a, b) if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }
        _ => DataType::Utf8,
    }
}
