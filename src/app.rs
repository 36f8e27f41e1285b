use std::time::Duration;

use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::services::DashboardService;
use crate::session::{AccessGate, SessionStore};
use crate::store::ReadingStore;

/// Longest period accepted for minute-based settings (one week)
pub const MAX_PERIOD_MINUTES: u64 = 7 * 24 * 60;

/// tokio intervals reject a zero period and panic when a deadline overflows
fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.clamp(1, MAX_PERIOD_MINUTES) * 60)
}

/// Running HTTP server
///
/// Refresh tasks are spawned per session at login, not here.
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
}

impl Application {
    pub fn state_from_config(config: &Config) -> AppState {
        let store = ReadingStore::from_source(&config.data_source);
        info!("Reading store: {}", store.describe());

        AppState {
            dashboard_service: DashboardService::new(store),
            sessions: SessionStore::with_idle_timeout(minutes(config.session_idle_minutes)),
            gate: AccessGate::new(config.access_password.clone()),
            refresh_interval: minutes(config.refresh_interval_minutes),
        }
    }

    /// Build the router and start serving on the configured address
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let state = Self::state_from_config(&config);
        if state.gate.is_open() {
            info!("No ACCESS_PASSWORD set, dashboard is open");
        }
        let app = create_router(state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

        info!("Application initialized successfully");
        Ok(Self { server_handle })
    }

    /// Run until the server stops
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}
