use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::export;
use crate::refresh;
use crate::services::{Dashboard, DashboardService, ReadingList, ServiceError};
use crate::session::{AccessGate, SessionStore, SESSION_COOKIE};
use crate::store::{Reading, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub sessions: SessionStore,
    pub gate: AccessGate,
    pub refresh_interval: Duration,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub gate_open: bool,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Add-reading form; the date defaults to today
#[derive(Debug, Deserialize)]
pub struct NewReading {
    pub date: Option<NaiveDate>,
    pub volume: f64,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn create_router(state: AppState) -> Router {
    let gated_routes = Router::new()
        .route("/readings", get(list_readings).post(add_reading))
        .route("/summary", get(get_summary))
        .route("/export.csv", get(export_csv))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/session", get(session_status))
        .route("/session/login", post(login))
        .route("/session/logout", post(logout))
        .merge(gated_routes)
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn service_error(e: ServiceError) -> ApiError {
    let status = match &e {
        ServiceError::Store(StoreError::SourceUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Store(StoreError::WriteRejected(_)) => StatusCode::BAD_GATEWAY,
        ServiceError::Pipeline(_) | ServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if state.gate.is_open() {
        return next.run(request).await;
    }

    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.touch(cookie.value()) {
            return next.run(request).await;
        }
    }

    warn!("Rejected unauthenticated request to {}", request.uri().path());
    api_error(StatusCode::UNAUTHORIZED, "Login required").into_response()
}

#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[instrument(skip(state, jar, request))]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(StatusCode, CookieJar), ApiError> {
    if !state.gate.check(&request.password) {
        warn!("Rejected login attempt with incorrect password");
        return Err(api_error(StatusCode::UNAUTHORIZED, "Incorrect password"));
    }

    // A fresh login replaces any session the browser still carries
    if let Some(previous) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(previous.value());
    }

    let session = state.sessions.create();
    refresh::spawn_refresh_task(
        state.dashboard_service.clone(),
        state.sessions.clone(),
        session.id.clone(),
        state.refresh_interval,
        session.cancellation_token(),
    );

    info!(session_id = %session.id, "Login successful");
    let max_age = i64::try_from(state.sessions.idle_timeout().as_secs()).unwrap_or(i64::MAX);
    let cookie = Cookie::build((SESSION_COOKIE, session.id))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(max_age))
        .build();
    Ok((StatusCode::NO_CONTENT, jar.add(cookie)))
}

#[instrument(skip(state, jar))]
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, CookieJar) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    (
        StatusCode::NO_CONTENT,
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
    )
}

#[instrument(skip(state, jar))]
async fn session_status(State(state): State<AppState>, jar: CookieJar) -> Json<SessionStatus> {
    let session = jar
        .get(SESSION_COOKIE)
        .filter(|cookie| state.sessions.touch(cookie.value()))
        .and_then(|cookie| state.sessions.get(cookie.value()));

    Json(SessionStatus {
        authenticated: state.gate.is_open()
            || session.as_ref().is_some_and(|session| session.authenticated),
        gate_open: state.gate.is_open(),
        last_refresh: session.and_then(|session| session.last_refresh),
    })
}

#[instrument(skip(state))]
async fn list_readings(State(state): State<AppState>) -> Result<Json<ReadingList>, ApiError> {
    debug!("Listing readings");
    let list = state.dashboard_service.readings().await.map_err(|e| {
        error!("Failed to list readings: {}", e);
        service_error(e)
    })?;

    info!(
        "Retrieved {} readings ({} dropped)",
        list.readings.len(),
        list.dropped
    );
    Ok(Json(list))
}

#[instrument(skip(state))]
async fn add_reading(
    State(state): State<AppState>,
    Json(form): Json<NewReading>,
) -> Result<(StatusCode, Json<Reading>), ApiError> {
    if !form.volume.is_finite() || form.volume < 0.0 {
        warn!("Rejected reading with volume {}", form.volume);
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Volume must be a non-negative number",
        ));
    }

    let date = form.date.unwrap_or_else(|| Local::now().date_naive());
    let reading = state
        .dashboard_service
        .add_reading(date, form.volume)
        .await
        .map_err(|e| {
            error!("Failed to append reading for {}: {}", date, e);
            service_error(e)
        })?;

    info!("Recorded {} m³ for {}", reading.volume, reading.date);
    Ok((StatusCode::CREATED, Json(reading)))
}

#[instrument(skip(state))]
async fn get_summary(State(state): State<AppState>) -> Result<Json<Dashboard>, ApiError> {
    debug!("Computing summary");
    let dashboard = state.dashboard_service.load_dashboard().await.map_err(|e| {
        error!("Failed to compute summary: {}", e);
        service_error(e)
    })?;
    Ok(Json(dashboard))
}

#[instrument(skip(state))]
async fn export_csv(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state.dashboard_service.export_csv().await.map_err(|e| {
        error!("Failed to export readings: {}", e);
        service_error(e)
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, export::CSV_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, export::content_disposition()),
        ],
        body,
    ))
}
