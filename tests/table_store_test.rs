// Hosted table backend tests against an in-process mock table

mod common;

use axum::http::StatusCode;
use chrono::NaiveDate;
use common::MockTable;
use serde_json::json;
use water_tracker_service::store::{
    RawReading, ReadingStore, StoreError, TableReadingStore, VolumeValue,
};
use water_tracker_service::summary::{self, SummaryOutcome};

#[tokio::test]
async fn test_list_filters_rows_missing_fields() {
    let table = MockTable::with_rows(vec![
        json!({"date": "2024-03-01", "volume": 5.0}),
        json!({"volume": 3.0}),
    ]);
    let url = table.serve().await;
    let store = TableReadingStore::new(url, None);

    let listing = store.list_readings().await.unwrap();

    assert_eq!(
        listing.readings,
        vec![RawReading::new("2024-03-01", VolumeValue::Number(5.0))]
    );
    assert_eq!(listing.dropped, 1);
}

#[tokio::test]
async fn test_append_then_list_includes_reading() {
    let table = MockTable::with_rows(vec![json!({"date": "2024-01-01", "volume": "10.0"})]);
    let url = table.serve().await;
    let store = ReadingStore::Table(TableReadingStore::new(url, None));

    store
        .append_reading(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), 12.5)
        .await
        .unwrap();

    assert_eq!(
        table.rows.lock().unwrap().last().cloned(),
        Some(json!({"date": "2024-01-15", "volume": 12.5}))
    );

    let listing = store.list_readings().await.unwrap();
    assert_eq!(listing.readings.len(), 2);
    assert!(listing
        .readings
        .contains(&RawReading::new("2024-01-15", VolumeValue::Number(12.5))));
}

#[tokio::test]
async fn test_mixed_types_flow_through_pipeline() {
    let table = MockTable::with_rows(vec![
        json!({"date": "2024-02-01", "volume": "9.0"}),
        json!({"date": "2024-01-01", "volume": 10}),
        json!({"date": "2024-01-15", "volume": "12.5"}),
    ]);
    let url = table.serve().await;
    let store = TableReadingStore::new(url, None);

    let listing = store.list_readings().await.unwrap();
    match summary::summarize(&listing.readings).unwrap() {
        SummaryOutcome::Ok { summary, .. } => {
            assert_eq!(summary.total, -1.0);
            assert_eq!(summary.mean, 10.5);
        }
        SummaryOutcome::Empty => panic!("expected a summary"),
    }
}

#[tokio::test]
async fn test_api_key_sent_as_bearer_token() {
    let table = MockTable::default();
    let url = table.serve().await;
    let store = TableReadingStore::new(url, Some("key-123".to_string()));

    store.list_readings().await.unwrap();

    assert_eq!(
        table.last_authorization.lock().unwrap().as_deref(),
        Some("Bearer key-123")
    );
}

#[tokio::test]
async fn test_backend_error_is_source_unavailable() {
    let table = MockTable::default();
    table.fail_with(StatusCode::INTERNAL_SERVER_ERROR);
    let url = table.serve().await;
    let store = TableReadingStore::new(url, None);

    let result = store.list_readings().await;
    assert!(matches!(result, Err(StoreError::SourceUnavailable(_))));
}

#[tokio::test]
async fn test_backend_error_rejects_write() {
    let table = MockTable::default();
    table.fail_with(StatusCode::FORBIDDEN);
    let url = table.serve().await;
    let store = TableReadingStore::new(url, None);

    let result = store
        .append_reading(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1.0)
        .await;
    assert!(matches!(result, Err(StoreError::WriteRejected(_))));
    assert!(table.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_backend() {
    // Bind then drop a listener so the port is closed
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let store = TableReadingStore::new(format!("http://{}/rows", addr), None);

    let list = store.list_readings().await;
    assert!(matches!(list, Err(StoreError::SourceUnavailable(_))));

    let append = store
        .append_reading(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1.0)
        .await;
    assert!(matches!(append, Err(StoreError::WriteRejected(_))));
}
