//! Integration tests for dataset storage and analysis.
//!
//! These tests drive the service end to end against CSV fixtures stored in a
//! temporary upload directory.

use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tabstat::storage::sweep_stale_files;
use tabstat::{AnalysisConfig, AnalysisService, ClassificationTag, DatasetStore, ValueCount};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn service() -> (TempDir, AnalysisService) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = AnalysisConfig::builder()
        .upload_dir(dir.path().join("uploads"))
        .build()
        .expect("Invalid config");
    let service = AnalysisService::from_config(config).expect("Failed to open service");
    (dir, service)
}

fn upload(service: &AnalysisService, fixture: &str) -> String {
    service
        .upload(&fixtures_path().join(fixture))
        .expect("Failed to upload fixture")
        .dataset_id
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ============================================================================
// Dataset Report Tests
// ============================================================================

#[test]
fn test_upload_reports_dataset_totals() {
    let (_dir, service) = service();
    let summary = service
        .upload(&fixtures_path().join("people.csv"))
        .unwrap();

    assert_eq!(summary.filename, "people.csv");
    assert_eq!(summary.rows, 7);
    assert_eq!(summary.columns, 5);

    let report = &summary.report;
    assert_eq!(report.total_rows, 7);
    assert_eq!(report.total_columns, 5);
    assert_eq!(report.analyzed_columns, 5);
    assert_eq!(report.total_missing_cells, 3);
    assert_eq!(report.duplicate_rows, 1);
    assert!(report.failures.is_empty());
}

#[test]
fn test_dataset_report_classifications() {
    let (_dir, service) = service();
    let id = upload(&service, "people.csv");
    let report = service.get_dataset_report(&id).unwrap();

    let tags: Vec<(&str, ClassificationTag)> = report
        .columns
        .iter()
        .map(|c| (c.name(), c.statistics.classification()))
        .collect();
    assert_eq!(
        tags,
        vec![
            ("name", ClassificationTag::Text),
            ("age", ClassificationTag::Numeric),
            ("city", ClassificationTag::Categorical),
            ("joined", ClassificationTag::Datetime),
            ("score", ClassificationTag::Numeric),
        ]
    );
}

#[test]
fn test_dataset_report_is_stable_across_requests() {
    let (_dir, service) = service();
    let id = upload(&service, "people.csv");
    let first = service.get_dataset_report(&id).unwrap();
    let second = service.get_dataset_report(&id).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Column Report Tests
// ============================================================================

#[test]
fn test_numeric_column_report() {
    let (_dir, service) = service();
    let id = upload(&service, "people.csv");
    let age = service.get_column_report(&id, "age").unwrap();

    assert_eq!(age.basic.count, 7);
    assert_eq!(age.basic.missing_values, 1);
    assert_eq!(age.basic.unique_values, 4);

    let stats = age.stats.numeric().unwrap();
    assert_eq!(stats.mean, Some(30.0));
    assert_eq!(stats.min, Some(25.0));
    assert_eq!(stats.quartile_25, Some(25.0));
    assert_eq!(stats.median, Some(27.5));
    assert_eq!(stats.quartile_75, Some(33.75));
    assert_eq!(stats.max, Some(40.0));
    assert!(approx(stats.std.unwrap(), 6.324555320336759));
}

#[test]
fn test_categorical_column_report() {
    let (_dir, service) = service();
    let id = upload(&service, "people.csv");
    let city = service.get_column_report(&id, "city").unwrap();
    let stats = city.stats.categorical().unwrap();

    assert_eq!(
        stats.most_common,
        vec![
            ValueCount { value: "NYC".to_string(), count: 4 },
            ValueCount { value: "LA".to_string(), count: 2 },
            ValueCount { value: "SF".to_string(), count: 1 },
        ]
    );
    assert_eq!(stats.least_common[0].value, "SF");
    assert!(approx(stats.value_distribution[0].percentage, 400.0 / 7.0));
}

#[test]
fn test_datetime_column_report_has_basic_only() {
    let (_dir, service) = service();
    let id = upload(&service, "people.csv");
    let joined = service.get_column_report(&id, "joined").unwrap();

    assert_eq!(joined.classification(), ClassificationTag::Datetime);
    let json = serde_json::to_value(&joined).unwrap();
    assert_eq!(json["stats"], serde_json::json!({ "type": "datetime" }));
    assert_eq!(joined.basic.unique_values, 6);
}

#[test]
fn test_column_report_errors() {
    let (_dir, service) = service();
    let id = upload(&service, "people.csv");

    let err = service.get_column_report(&id, "salary").unwrap_err();
    assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");

    let err = service.get_column_report("20000101_000000_deadbeef.csv", "age").unwrap_err();
    assert_eq!(err.error_code(), "DATASET_NOT_FOUND");
}

// ============================================================================
// Quality Report Tests
// ============================================================================

#[test]
fn test_quality_report_distinguishes_blank_and_null() {
    let (_dir, service) = service();
    let id = upload(&service, "notes.csv");
    let report = service.get_quality_report(&id).unwrap();

    assert_eq!(report.total_rows, 5);
    let notes = report.column("notes").unwrap();
    assert_eq!(notes.null_count, 2);
    assert_eq!(notes.missing_count, 3);
    assert_eq!(notes.unique_count, 1);
    assert_eq!(notes.duplicate_count, 1);

    for column in &report.columns {
        assert!(column.metrics.missing_count >= column.metrics.null_count);
    }
}

#[test]
fn test_formatted_numbers_are_numeric() {
    let (_dir, service) = service();
    let id = upload(&service, "notes.csv");
    let amount = service.get_column_report(&id, "amount").unwrap();

    assert_eq!(amount.classification(), ClassificationTag::Numeric);
    let stats = amount.stats.numeric().unwrap();
    assert_eq!(stats.min, Some(80.0));
    assert_eq!(stats.max, Some(1200.0));
    assert_eq!(stats.median, Some(80.0));
}

// ============================================================================
// Store Tests
// ============================================================================

#[test]
fn test_unsupported_upload_is_rejected() {
    let (dir, service) = service();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "not a table").unwrap();

    let err = service.upload(&path).unwrap_err();
    assert_eq!(err.error_code(), "UNSUPPORTED_FILE_FORMAT");
    assert!(err.is_client_error());
    assert!(service.list_datasets().unwrap().is_empty());
}

#[test]
fn test_list_and_delete_datasets() {
    let (_dir, service) = service();
    let people = upload(&service, "people.csv");
    let notes = upload(&service, "notes.csv");

    let datasets = service.list_datasets().unwrap();
    assert_eq!(datasets.len(), 2);
    let mut ids: Vec<&str> = datasets.iter().map(|d| d.id.as_str()).collect();
    ids.sort();
    let mut expected = vec![people.as_str(), notes.as_str()];
    expected.sort();
    assert_eq!(ids, expected);

    service.delete_dataset(&people).unwrap();
    let remaining = service.list_datasets().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, notes);
    assert_eq!(remaining[0].columns, 3);
}

#[test]
fn test_head_preview() {
    let (_dir, service) = service();
    let id = upload(&service, "people.csv");
    let preview = service.head(&id, 3).unwrap();

    assert_eq!(preview.columns, vec!["name", "age", "city", "joined", "score"]);
    assert_eq!(preview.total_rows, 7);
    assert_eq!(preview.rows.len(), 3);
    assert_eq!(preview.rows[2][1], serde_json::Value::Null);
    assert_eq!(preview.rows[0][4], serde_json::json!(88.5));
}

#[test]
fn test_stale_uploads_are_swept() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(DatasetStore::open(dir.path()).unwrap());
    let service = AnalysisService::new(Arc::clone(&store), AnalysisConfig::default());
    let id = upload(&service, "people.csv");

    let fresh = sweep_stale_files(&store, Duration::from_secs(1800), SystemTime::now()).unwrap();
    assert!(fresh.removed.is_empty());

    let later = SystemTime::now() + Duration::from_secs(3600);
    let swept = sweep_stale_files(&store, Duration::from_secs(1800), later).unwrap();
    assert_eq!(swept.removed, vec![id.clone()]);
    assert!(service.get_dataset_report(&id).unwrap_err().is_not_found());
}
