#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tempfile::TempDir;

use water_tracker_service::api::AppState;
use water_tracker_service::services::DashboardService;
use water_tracker_service::session::{AccessGate, SessionStore};
use water_tracker_service::store::{FileReadingStore, ReadingStore};

pub const REFERENCE_CSV: &str = "date,volume\n2024-01-15,12.5\n2024-01-01,10.0\n2024-02-01,9.0\n";

/// App state over a temporary CSV file
pub fn file_state(content: Option<&str>, password: Option<&str>) -> (TempDir, AppState) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("eau.csv");
    if let Some(content) = content {
        std::fs::write(&path, content).expect("Failed to write fixture CSV");
    }

    let state = AppState {
        dashboard_service: DashboardService::new(ReadingStore::File(FileReadingStore::new(path))),
        sessions: SessionStore::new(),
        gate: AccessGate::new(password.map(str::to_string)),
        refresh_interval: Duration::from_secs(300),
    };
    (dir, state)
}

/// In-process stand-in for a hosted table backend
#[derive(Clone, Default)]
pub struct MockTable {
    pub rows: Arc<Mutex<Vec<Value>>>,
    pub fail_with: Arc<Mutex<Option<StatusCode>>>,
    pub last_authorization: Arc<Mutex<Option<String>>>,
}

impl MockTable {
    pub fn with_rows(rows: Vec<Value>) -> Self {
        let table = Self::default();
        *table.rows.lock().unwrap() = rows;
        table
    }

    pub fn fail_with(&self, status: StatusCode) {
        *self.fail_with.lock().unwrap() = Some(status);
    }

    /// Serve on an ephemeral port, returning the table URL
    pub async fn serve(&self) -> String {
        let app = Router::new()
            .route("/rows", get(list_rows).post(append_row))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock table");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        format!("http://{}/rows", addr)
    }

    fn record_authorization(&self, headers: &HeaderMap) {
        *self.last_authorization.lock().unwrap() = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }
}

async fn list_rows(
    State(table): State<MockTable>,
    headers: HeaderMap,
) -> Result<Json<Vec<Value>>, StatusCode> {
    table.record_authorization(&headers);
    if let Some(status) = *table.fail_with.lock().unwrap() {
        return Err(status);
    }
    Ok(Json(table.rows.lock().unwrap().clone()))
}

async fn append_row(
    State(table): State<MockTable>,
    headers: HeaderMap,
    Json(row): Json<Value>,
) -> StatusCode {
    table.record_authorization(&headers);
    if let Some(status) = *table.fail_with.lock().unwrap() {
        return status;
    }
    table.rows.lock().unwrap().push(row);
    StatusCode::CREATED
}
