//! End-to-end pipeline tests
//!
//! Each test lays out a catalog and source data in a temp directory and runs
//! the whole job against a local or in-memory destination.

use arrow::array::{Array, Float64Array, Int64Array};
use arrow::record_batch::RecordBatch;
use fraud_etl::catalog::{open_catalog, Catalog};
use fraud_etl::config::{JobConfig, JobOverrides};
use fraud_etl::error::ErrorKind;
use fraud_etl::job::Job;
use fraud_etl::storage::StorageLocation;
use fraud_etl::{JobState, MissingFieldPolicy, Stage};
use futures::TryStreamExt;
use object_store::memory::InMemory;
use object_store::{ObjectMeta, ObjectStore};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A mapped output row: (timestamp, amount, latitude, longitude, fraud, score)
type Row = (i64, f64, f64, f64, i64, f64);

const EXAMPLE: Row = (1_690_000_000, 42.50, 37.7749, -122.4194, 0, 0.12);

/// One headerless CSV line with 34 columns, `col0`..`col33`
fn csv_line(row: Row) -> String {
    let mut values = vec![row.0.to_string()];
    values.extend((1..29).map(|i| format!("{:.3}", f64::from(i) * -0.01)));
    values.push(row.1.to_string());
    values.push(row.2.to_string());
    values.push(row.3.to_string());
    values.push(row.4.to_string());
    values.push(row.5.to_string());
    values.join(",")
}

/// Write a YAML catalog with `frauddb.transactions` pointing at `data/`
fn write_catalog(dir: &Path, rows: &[Row]) -> PathBuf {
    let data = dir.join("data");
    fs::create_dir_all(&data).unwrap();

    let body: Vec<String> = rows.iter().copied().map(csv_line).collect();
    fs::write(data.join("part-00000.csv"), body.join("\n") + "\n").unwrap();
    fs::write(data.join("_SUCCESS"), "").unwrap();

    let catalog = dir.join("catalog.yaml");
    fs::write(
        &catalog,
        r#"
databases:
  frauddb:
    description: Scored card transactions
    tables:
      transactions:
        location: data/
        format: csv
        csv:
          header: false
"#,
    )
    .unwrap();
    catalog
}

/// Write a YAML catalog with `frauddb.transactions` pointing at `data/rows.json`
fn write_json_catalog(dir: &Path) -> PathBuf {
    let catalog = dir.join("catalog.yaml");
    fs::write(
        &catalog,
        "databases:\n  frauddb:\n    tables:\n      transactions:\n        location: data/rows.json\n        format: json\n",
    )
    .unwrap();
    catalog
}

fn assert_mismatch(
    err: &fraud_etl::Error,
    stage: Stage,
    expected_field: &str,
    expected_row: Option<usize>,
) {
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch, "got {err}");
    assert_eq!(err.stage(), Some(stage));
    match err.root() {
        fraud_etl::Error::SchemaMismatch { field, row, .. } => {
            assert_eq!(field, expected_field);
            assert_eq!(*row, expected_row);
        }
        other => panic!("Expected SchemaMismatch, got {other:?}"),
    }
}

fn config(catalog: &Path, destination: &Path) -> JobConfig {
    JobConfig::default().with_overrides(JobOverrides {
        job_name: Some("fraud-integration".to_string()),
        database: Some("frauddb".to_string()),
        table: Some("transactions".to_string()),
        destination_url: Some(destination.display().to_string()),
        catalog: Some(catalog.to_path_buf()),
        ..JobOverrides::default()
    })
}

fn parquet_files(dir: &Path, run_id: &str) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    let prefix = format!("run-{run_id}-");
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".parquet"))
        })
        .collect();
    files.sort();
    files
}

fn rows_of(batch: &RecordBatch) -> Vec<Row> {
    let i64_col = |name: &str| {
        batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap()
            .clone()
    };
    let f64_col = |name: &str| {
        batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap()
            .clone()
    };

    let (ts, amount, lat, lon, fraud, score) = (
        i64_col("timestamp"),
        f64_col("amount"),
        f64_col("latitude"),
        f64_col("longitude"),
        i64_col("fraud"),
        f64_col("score"),
    );
    (0..batch.num_rows())
        .map(|i| {
            (
                ts.value(i),
                amount.value(i),
                lat.value(i),
                lon.value(i),
                fraud.value(i),
                score.value(i),
            )
        })
        .collect()
}

fn read_parquet(files: &[PathBuf]) -> Vec<Row> {
    let mut rows = Vec::new();
    for file in files {
        let reader = ParquetRecordBatchReaderBuilder::try_new(fs::File::open(file).unwrap())
            .unwrap()
            .build()
            .unwrap();
        for batch in reader {
            let batch = batch.unwrap();
            let names: Vec<&str> = batch
                .schema_ref()
                .fields()
                .iter()
                .map(|f| f.name().as_str())
                .collect();
            assert_eq!(
                names,
                vec!["timestamp", "amount", "latitude", "longitude", "fraud", "score"]
            );
            rows.extend(rows_of(&batch));
        }
    }
    rows
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_example_record_roundtrip() {
    let dir = TempDir::new().unwrap();
    let catalog = write_catalog(dir.path(), &[EXAMPLE]);
    let out = dir.path().join("out");

    let params = config(&catalog, &out).resolve().unwrap();
    let mut job = Job::new(params).unwrap().with_run_id("1");
    let summary = job.run().await.unwrap();

    assert_eq!(summary.state, JobState::Succeeded);
    assert_eq!(summary.rows_read, 1);
    assert_eq!(summary.rows_written, 1);

    let files = parquet_files(&out, "1");
    assert_eq!(files.len(), 1);
    assert_eq!(read_parquet(&files), vec![EXAMPLE]);
}

#[tokio::test]
async fn test_example_record_to_bucket_url() {
    let dir = TempDir::new().unwrap();
    let catalog_path = write_catalog(dir.path(), &[EXAMPLE]);
    let store = Arc::new(InMemory::new());
    let destination = StorageLocation::from_store(store.clone(), "s3", "fraud-output", "");

    let params = JobConfig::default()
        .with_overrides(JobOverrides {
            database: Some("frauddb".to_string()),
            table: Some("transactions".to_string()),
            destination_bucket: Some("fraud-output".to_string()),
            catalog: Some(catalog_path.clone()),
            ..JobOverrides::default()
        })
        .resolve()
        .unwrap();
    assert_eq!(params.destination, "s3://fraud-output/");

    let catalog: Arc<dyn Catalog> = open_catalog(&catalog_path).unwrap();
    let summary = Job::with_parts(params, catalog, destination)
        .with_run_id("7")
        .run()
        .await
        .unwrap();

    assert_eq!(
        summary.files[0].url,
        "s3://fraud-output/run-7-part-r-00000.snappy.parquet"
    );

    let metas: Vec<ObjectMeta> = store.list(None).try_collect().await.unwrap();
    assert_eq!(metas.len(), 1);
    let data = store.get(&metas[0].location).await.unwrap().bytes().await.unwrap();
    let batches: Vec<RecordBatch> = ParquetRecordBatchReaderBuilder::try_new(data)
        .unwrap()
        .build()
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(rows_of(&batches[0]), vec![EXAMPLE]);
}

#[tokio::test]
async fn test_missing_table_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let catalog = write_catalog(dir.path(), &[EXAMPLE]);
    let out = dir.path().join("out");

    let params = config(&catalog, &out)
        .with_overrides(JobOverrides {
            table: Some("missing_table".to_string()),
            ..JobOverrides::default()
        })
        .resolve()
        .unwrap();
    let mut job = Job::new(params).unwrap();
    let err = job.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.stage(), Some(Stage::Extract));
    assert!(err.to_string().contains("frauddb.missing_table"));
    assert_eq!(job.state(), JobState::Failed);
    assert!(!out.exists());
}

#[tokio::test]
async fn test_write_denied_fails_after_read_and_map() {
    let dir = TempDir::new().unwrap();
    let catalog = write_catalog(dir.path(), &[EXAMPLE]);

    // A regular file where the destination directory should be
    let blocker = dir.path().join("locked");
    fs::write(&blocker, "not a directory").unwrap();
    let out = blocker.join("out");

    let params = config(&catalog, &out).resolve().unwrap();
    let err = Job::new(params).unwrap().run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Write);
    assert_eq!(err.stage(), Some(Stage::Load));
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "not a directory");
}

#[tokio::test]
async fn test_missing_field_is_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        data.join("rows.json"),
        concat!(
            r#"{"col0": 1690000000, "col29": 42.5, "col30": 37.7749, "col31": -122.4194, "col32": 0, "col33": 0.12}"#,
            "\n",
            r#"{"col0": 1690000060, "col29": 10.0, "col30": 40.0, "col31": -70.0, "col32": 1}"#,
            "\n",
        ),
    )
    .unwrap();
    let catalog = write_json_catalog(dir.path());
    let out = dir.path().join("out");

    let params = config(&catalog, &out).resolve().unwrap();
    let err = Job::new(params).unwrap().run().await.unwrap_err();

    assert_mismatch(&err, Stage::Transform, "col33", Some(1));
    assert!(!out.exists());

    // The same data passes with the null policy, keeping both records
    let params = config(&catalog, &out)
        .with_overrides(JobOverrides {
            missing_field_policy: Some(MissingFieldPolicy::Null),
            ..JobOverrides::default()
        })
        .resolve()
        .unwrap();
    let summary = Job::new(params).unwrap().run().await.unwrap();
    assert_eq!(summary.rows_written, 2);
}

#[tokio::test]
async fn test_short_csv_record_is_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let catalog = write_catalog(dir.path(), &[EXAMPLE]);

    // Second record stops after col30
    let short: Vec<String> = csv_line(EXAMPLE).split(',').take(31).map(String::from).collect();
    let part = dir.path().join("data").join("part-00000.csv");
    let body = fs::read_to_string(&part).unwrap() + &short.join(",") + "\n";
    fs::write(&part, body).unwrap();
    let out = dir.path().join("out");

    let params = config(&catalog, &out).resolve().unwrap();
    let err = Job::new(params).unwrap().run().await.unwrap_err();

    assert_mismatch(&err, Stage::Transform, "col31", Some(1));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_wrong_type_column_is_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        data.join("rows.json"),
        concat!(
            r#"{"col0": 1690000000, "col29": 42.5, "col30": 37.7749, "col31": -122.4194, "col32": false, "col33": 0.12}"#,
            "\n",
        ),
    )
    .unwrap();
    let catalog = write_json_catalog(dir.path());
    let out = dir.path().join("out");

    let params = config(&catalog, &out).resolve().unwrap();
    let err = Job::new(params).unwrap().run().await.unwrap_err();

    assert_mismatch(&err, Stage::Transform, "col32", None);
    assert!(err.to_string().contains("expected long but found Boolean"));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_rerun_produces_same_records() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<Row> = (0..25)
        .map(|i| (1_690_000_000 + i, 1.5 * i as f64, 37.0, -122.0, i % 2, 0.01 * i as f64))
        .collect();
    let catalog = write_catalog(dir.path(), &rows);
    let out = dir.path().join("out");

    let params = config(&catalog, &out).resolve().unwrap();
    Job::new(params).unwrap().with_run_id("1").run().await.unwrap();

    let params = config(&catalog, &out)
        .with_overrides(JobOverrides {
            max_rows_per_file: Some(10),
            ..JobOverrides::default()
        })
        .resolve()
        .unwrap();
    let summary = Job::new(params).unwrap().with_run_id("2").run().await.unwrap();
    assert_eq!(summary.files.len(), 3);

    let first = read_parquet(&parquet_files(&out, "1"));
    let second = read_parquet(&parquet_files(&out, "2"));
    assert_eq!(first.len(), 25);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_duckdb_catalog_end_to_end() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("warehouse.duckdb");
    {
        let conn = duckdb::Connection::open(&db_path).unwrap();
        conn.execute_batch(
            r"
            CREATE SCHEMA frauddb;
            CREATE TABLE frauddb.transactions (
                col0 BIGINT, col1 DOUBLE, col29 DOUBLE, col30 DOUBLE,
                col31 DOUBLE, col32 BIGINT, col33 DOUBLE
            );
            INSERT INTO frauddb.transactions VALUES
                (1690000000, -1.36, 42.5, 37.7749, -122.4194, 0, 0.12);
            ",
        )
        .unwrap();
    }
    let out = dir.path().join("out");

    let catalog = open_catalog(&db_path).unwrap();
    assert_eq!(catalog.name(), "duckdb");
    assert_eq!(catalog.list_tables("frauddb").await.unwrap(), vec!["transactions"]);

    let params = config(&db_path, &out).resolve().unwrap();
    Job::new(params).unwrap().with_run_id("1").run().await.unwrap();

    assert_eq!(read_parquet(&parquet_files(&out, "1")), vec![EXAMPLE]);
}
