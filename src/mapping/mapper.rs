//! Field mapper
//!
//! Projects, renames and casts mapped columns. Every batch is mapped
//! independently, so batches can be spread over the blocking pool.

use crate::error::{Error, Result};
use crate::mapping::types::{FieldMapping, MappingTable};
use crate::types::{FieldType, MissingFieldPolicy};
use arrow::array::{Array, ArrayRef};
use arrow::compute::kernels::cmp::distinct;
use arrow::compute::{can_cast_types, cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;

/// Applies a mapping table to record batches
#[derive(Debug, Clone)]
pub struct FieldMapper {
    table: Arc<MappingTable>,
    policy: MissingFieldPolicy,
    parallelism: usize,
    output_schema: SchemaRef,
}

impl FieldMapper {
    /// Create a mapper with the `fail` policy and no parallelism
    pub fn new(table: MappingTable) -> Self {
        let output_schema = Arc::new(table.output_schema(MissingFieldPolicy::Fail));
        Self {
            table: Arc::new(table),
            policy: MissingFieldPolicy::Fail,
            parallelism: 1,
            output_schema,
        }
    }

    /// Set the missing-field policy
    #[must_use]
    pub fn with_policy(mut self, policy: MissingFieldPolicy) -> Self {
        self.policy = policy;
        self.output_schema = Arc::new(self.table.output_schema(policy));
        self
    }

    /// Set how many batches are mapped concurrently
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// The mapping table
    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// Schema of every batch this mapper produces
    pub fn output_schema(&self) -> SchemaRef {
        self.output_schema.clone()
    }

    /// Check that a source schema can satisfy the mapping table
    ///
    /// Reports the first mapped column that is absent or whose type cannot
    /// feed its declared source type (booleans or timestamps for a numeric
    /// column, for example).
    pub fn validate_schema(&self, schema: &Schema) -> Result<()> {
        for mapping in self.table.entries() {
            let field = schema.field_with_name(&mapping.source).map_err(|_| {
                Error::schema_mismatch(&mapping.source, "column not present in source schema")
            })?;
            check_source_type(mapping, field.data_type())?;
        }
        Ok(())
    }

    /// Map one batch; `row_offset` is the index of its first row in the run
    pub fn map_batch(&self, batch: &RecordBatch, row_offset: usize) -> Result<RecordBatch> {
        let columns = self
            .table
            .entries()
            .iter()
            .map(|mapping| self.map_column(mapping, batch, row_offset))
            .collect::<Result<Vec<ArrayRef>>>()?;

        Ok(RecordBatch::try_new(self.output_schema.clone(), columns)?)
    }

    /// Map every batch, preserving input order
    pub async fn map_batches(&self, batches: Vec<RecordBatch>) -> Result<Vec<RecordBatch>> {
        let mut offset = 0;
        let work: Vec<(usize, RecordBatch)> = batches
            .into_iter()
            .map(|batch| {
                let start = offset;
                offset += batch.num_rows();
                (start, batch)
            })
            .collect();

        tracing::debug!(
            "Mapping {} batches ({} rows) with parallelism {}",
            work.len(),
            offset,
            self.parallelism
        );

        stream::iter(work)
            .map(|(start, batch)| {
                let mapper = self.clone();
                tokio::task::spawn_blocking(move || mapper.map_batch(&batch, start))
            })
            .buffered(self.parallelism)
            .map(|joined| match joined {
                Ok(result) => result,
                Err(e) => Err(Error::Other(format!("Mapping task failed: {e}"))),
            })
            .try_collect()
            .await
    }

    fn map_column(
        &self,
        mapping: &FieldMapping,
        batch: &RecordBatch,
        row_offset: usize,
    ) -> Result<ArrayRef> {
        let source = batch.column_by_name(&mapping.source).ok_or_else(|| {
            Error::schema_mismatch(&mapping.source, "column not present in source schema")
        })?;
        check_source_type(mapping, source.data_type())?;

        if self.policy == MissingFieldPolicy::Fail && source.null_count() > 0 {
            let row = (0..source.len()).find(|&i| source.is_null(i)).unwrap_or(0);
            return Err(Error::record_mismatch(
                &mapping.source,
                row_offset + row,
                "value is missing",
            ));
        }

        let declared = cast_checked(source, mapping.source_type, mapping, row_offset)?;
        cast_checked(&declared, mapping.target_type, mapping, row_offset)
    }
}

/// Whether a source column of type `actual` may feed a mapping declared as `declared`
///
/// Text is parsed value by value and numbers are converted with a value
/// check, so both are accepted here. Booleans, temporals and nested types
/// only match themselves.
fn accepts_source(actual: &DataType, declared: &DataType) -> bool {
    match (actual, declared) {
        (a, d) if a == d => true,
        (DataType::Null | DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View, _) => true,
        (a, DataType::Utf8) => can_cast_types(a, declared),
        (a, d) => a.is_numeric() && d.is_numeric(),
    }
}

fn check_source_type(mapping: &FieldMapping, actual: &DataType) -> Result<()> {
    if accepts_source(actual, &mapping.source_type.data_type()) {
        return Ok(());
    }
    Err(Error::schema_mismatch(
        &mapping.source,
        format!("expected {} but found {actual}", mapping.source_type),
    ))
}

/// Numeric conversions that can silently change a value: anything into an
/// integer (fractions, overflow) and integers into floats (precision)
fn may_lose_value(from: &DataType, to: &DataType) -> bool {
    from.is_numeric()
        && to.is_numeric()
        && (to.is_integer() || (from.is_integer() && to.is_floating()))
}

fn cast_error(
    array: &ArrayRef,
    row: usize,
    to: FieldType,
    mapping: &FieldMapping,
    row_offset: usize,
) -> Error {
    Error::Cast {
        field: mapping.source.clone(),
        row: row_offset + row,
        value: array_value_to_string(array.as_ref(), row).unwrap_or_default(),
        target: to.to_string(),
    }
}

/// Cast an array, failing on the first value the target type cannot hold exactly
fn cast_checked(
    array: &ArrayRef,
    to: FieldType,
    mapping: &FieldMapping,
    row_offset: usize,
) -> Result<ArrayRef> {
    let target = to.data_type();
    if array.data_type() == &target {
        return Ok(array.clone());
    }

    let options = CastOptions {
        safe: true,
        ..Default::default()
    };
    let cast = cast_with_options(array, &target, &options)?;

    if cast.null_count() > array.null_count() {
        if let Some(row) = (0..array.len()).find(|&i| array.is_valid(i) && cast.is_null(i)) {
            return Err(cast_error(array, row, to, mapping, row_offset));
        }
    }

    if may_lose_value(array.data_type(), &target) {
        let back = cast_with_options(&cast, array.data_type(), &options)?;
        let changed = distinct(array, &back)?;
        if let Some(row) = (0..changed.len()).find(|&i| changed.value(i)) {
            return Err(cast_error(array, row, to, mapping, row_offset));
        }
    }

    Ok(cast)
}
