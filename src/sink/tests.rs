//! Tests for sink module

use super::*;
use crate::error::ErrorKind;
use crate::storage::StorageLocation;
use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload, PutResult,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// Store that refuses every write
#[derive(Debug, Default)]
struct DenyWriteStore {
    inner: InMemory,
}

impl std::fmt::Display for DenyWriteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DenyWriteStore")
    }
}

fn denied(location: &ObjectPath) -> object_store::Error {
    object_store::Error::PermissionDenied {
        path: location.to_string(),
        source: "write access denied".into(),
    }
}

#[async_trait]
impl ObjectStore for DenyWriteStore {
    async fn put_opts(
        &self,
        location: &ObjectPath,
        _payload: PutPayload,
        _opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        Err(denied(location))
    }

    async fn put_multipart_opts(
        &self,
        location: &ObjectPath,
        _opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        Err(denied(location))
    }

    async fn get_opts(
        &self,
        location: &ObjectPath,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &ObjectPath) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&ObjectPath>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(
        &self,
        prefix: Option<&ObjectPath>,
    ) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &ObjectPath, to: &ObjectPath) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(
        &self,
        from: &ObjectPath,
        to: &ObjectPath,
    ) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

fn output_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("timestamp", DataType::Int64, false),
        Field::new("score", DataType::Float64, false),
    ]))
}

fn batch(start: i64, rows: usize) -> RecordBatch {
    let ts: Vec<i64> = (0..rows as i64).map(|i| start + i).collect();
    let score: Vec<f64> = (0..rows).map(|i| i as f64 / 10.0).collect();
    RecordBatch::try_new(
        output_schema(),
        vec![
            Arc::new(Int64Array::from(ts)) as ArrayRef,
            Arc::new(Float64Array::from(score)) as ArrayRef,
        ],
    )
    .unwrap()
}

fn memory_sink() -> (Arc<InMemory>, SinkWriter) {
    let store = Arc::new(InMemory::new());
    let destination = StorageLocation::from_store(store.clone(), "s3", "fraud-output", "");
    (store, SinkWriter::new(destination).with_run_id("1690000000000"))
}

async fn read_back(store: &InMemory) -> Vec<(i64, f64)> {
    let mut metas: Vec<ObjectMeta> = store.list(None).try_collect().await.unwrap();
    metas.sort_by(|a, b| a.location.as_ref().cmp(b.location.as_ref()));

    let mut rows = Vec::new();
    for meta in metas {
        let data = store.get(&meta.location).await.unwrap().bytes().await.unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(data)
            .unwrap()
            .build()
            .unwrap();
        for batch in reader {
            let batch = batch.unwrap();
            let ts = batch
                .column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap()
                .clone();
            let score = batch
                .column(1)
                .as_any()
                .downcast_ref::<Float64Array>()
                .unwrap()
                .clone();
            for i in 0..batch.num_rows() {
                rows.push((ts.value(i), score.value(i)));
            }
        }
    }
    rows
}

// ============================================================================
// Writer Config Tests
// ============================================================================

#[test]
fn test_writer_config_defaults() {
    let config = ParquetWriterConfig::default();
    assert_eq!(config.compression(), ParquetCompression::Snappy);
    assert_eq!(config.row_group_size(), 1024 * 1024);
}

#[test]
fn test_encode_parquet_is_readable() {
    let config = ParquetWriterConfig::new()
        .with_compression(ParquetCompression::Zstd)
        .with_row_group_size(2)
        .with_dictionary(false)
        .with_statistics(false);

    let data = encode_parquet(output_schema(), &[batch(0, 5)], &config).unwrap();
    assert_eq!(&data[..4], b"PAR1");

    let builder = ParquetRecordBatchReaderBuilder::try_new(data).unwrap();
    assert_eq!(builder.metadata().num_row_groups(), 3);
    let schema = builder.schema();
    assert_eq!(schema.field(0).name(), "timestamp");
    assert_eq!(schema.field(1).data_type(), &DataType::Float64);
}

// ============================================================================
// File Planning Tests
// ============================================================================

#[test]
fn test_file_name_format() {
    let (_, sink) = memory_sink();
    assert_eq!(sink.file_name(0), "run-1690000000000-part-r-00000.snappy.parquet");

    let sink = sink.with_config(ParquetWriterConfig::new().with_compression(ParquetCompression::None));
    assert_eq!(sink.file_name(12), "run-1690000000000-part-r-00012.uncompressed.parquet");
}

#[test]
fn test_plan_files_splits_rows() {
    let (_, sink) = memory_sink();
    let sink = sink.with_max_rows_per_file(4);

    let plan = sink.plan_files(&[batch(0, 3), batch(3, 0), batch(3, 6)]);
    let sizes: Vec<usize> = plan
        .iter()
        .map(|f| f.iter().map(RecordBatch::num_rows).sum())
        .collect();
    assert_eq!(sizes, vec![4, 4, 1]);
}

#[test]
fn test_plan_files_empty() {
    let (_, sink) = memory_sink();
    assert!(sink.plan_files(&[]).is_empty());
    assert!(sink.plan_files(&[batch(0, 0)]).is_empty());
}

// ============================================================================
// Write Tests
// ============================================================================

#[tokio::test]
async fn test_write_roundtrip() {
    let (store, sink) = memory_sink();
    let sink = sink.with_max_rows_per_file(3);

    let written = sink
        .write(output_schema(), &[batch(100, 4), batch(104, 1)])
        .await
        .unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(
        written[0].url,
        "s3://fraud-output/run-1690000000000-part-r-00000.snappy.parquet"
    );
    assert_eq!(written[0].rows, 3);
    assert_eq!(written[1].rows, 2);

    let rows = read_back(&store).await;
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0], (100, 0.0));
    assert_eq!(rows[4].0, 104);
}

#[tokio::test]
async fn test_write_twice_same_logical_content() {
    let store = Arc::new(InMemory::new());
    let destination = StorageLocation::from_store(store.clone(), "s3", "fraud-output", "");
    let input = [batch(0, 10)];

    SinkWriter::new(destination.clone())
        .with_run_id("1")
        .write(output_schema(), &input)
        .await
        .unwrap();
    let first = read_back(&store).await;

    let second_store = Arc::new(InMemory::new());
    let second_destination =
        StorageLocation::from_store(second_store.clone(), "s3", "fraud-output", "");
    SinkWriter::new(second_destination)
        .with_run_id("2")
        .with_max_rows_per_file(4)
        .write(output_schema(), &input)
        .await
        .unwrap();
    let second = read_back(&second_store).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_write_keeps_unrelated_objects() {
    let (store, sink) = memory_sink();
    store
        .put(&ObjectPath::from("README.txt"), bytes::Bytes::from_static(b"keep me").into())
        .await
        .unwrap();

    sink.write(output_schema(), &[batch(0, 2)]).await.unwrap();

    let data = store
        .get(&ObjectPath::from("README.txt"))
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(data.as_ref(), b"keep me");
}

#[tokio::test]
async fn test_write_empty_commits_nothing() {
    let (store, sink) = memory_sink();
    let written = sink.write(output_schema(), &[]).await.unwrap();
    assert!(written.is_empty());

    let metas: Vec<ObjectMeta> = store.list(None).try_collect().await.unwrap();
    assert!(metas.is_empty());
}

#[tokio::test]
async fn test_write_denied_is_write_error() {
    let store = Arc::new(DenyWriteStore::default());
    let destination = StorageLocation::from_store(store.clone(), "s3", "locked-bucket", "");

    let err = SinkWriter::new(destination)
        .write(output_schema(), &[batch(0, 2)])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Write);
    assert!(err.to_string().contains("s3://locked-bucket/run-"));

    let metas: Vec<ObjectMeta> = store.list(None).try_collect().await.unwrap();
    assert!(metas.is_empty());
}
