use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::services::DashboardService;
use crate::session::SessionStore;

/// Periodically recompute the dashboard for one session
///
/// The first tick fires immediately. The loop ends when `cancel` fires, the
/// session disappears from the store, or a tick finds the session idle past the
/// store's timeout (the session is then ended). Failed loads are logged and
/// wait for the next tick.
pub fn spawn_refresh_task(
    service: DashboardService,
    sessions: SessionStore,
    session_id: String,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_refresh_loop(service, sessions, session_id, interval, cancel).await;
    })
}

#[instrument(skip_all, fields(session_id = %session_id, interval_secs = interval.as_secs()))]
async fn run_refresh_loop(
    service: DashboardService,
    sessions: SessionStore,
    session_id: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    info!("Refresh task started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Refresh task cancelled");
                break;
            }
            _ = ticker.tick() => {
                if sessions.expire_if_idle(&session_id, Utc::now()) {
                    debug!("Session idle, stopping refresh");
                    break;
                }
                debug!("Refresh tick - reloading readings");
                match service.load_dashboard().await {
                    Ok(dashboard) => {
                        if !sessions.record_refresh(&session_id, Utc::now(), dashboard) {
                            debug!("Session no longer exists, stopping refresh");
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to refresh dashboard: {}", e);
                    }
                }
            }
        }
    }

    info!("Refresh task stopped");
}
