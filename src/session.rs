//! Access gate and per-session context
//!
//! The gate is a shared-secret equality check, not a security boundary.
//! A session exists from a successful login until logout or until it goes
//! unused for the idle timeout; ending it cancels the session's refresh task.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::services::Dashboard;

pub const SESSION_COOKIE: &str = "water_session";

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Default)]
pub struct AccessGate {
    secret: Option<String>,
}

impl AccessGate {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// No secret configured; every visitor is let through
    pub fn is_open(&self) -> bool {
        self.secret.is_none()
    }

    pub fn check(&self, input: &str) -> bool {
        match &self.secret {
            Some(secret) => secret == input,
            None => true,
        }
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("open", &self.is_open())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub authenticated: bool,
    pub created_at: DateTime<Utc>,
    /// Last authenticated request carrying this session's cookie
    pub last_seen: DateTime<Utc>,
    pub last_refresh: Option<DateTime<Utc>>,
    /// Dashboard computed by the latest refresh
    pub snapshot: Option<Dashboard>,
    cancel_token: CancellationToken,
}

impl Session {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        // A last_seen in the future (clock step) reads as active
        (now - self.last_seen)
            .to_std()
            .is_ok_and(|idle| idle >= timeout)
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Start an authenticated session
    pub fn create(&self) -> Session {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            authenticated: true,
            created_at: now,
            last_seen: now,
            last_refresh: None,
            snapshot: None,
            cancel_token: CancellationToken::new(),
        };

        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id.clone(), session.clone());
        info!(session_id = %session.id, "Session started");
        session
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn is_authenticated(&self, id: &str) -> bool {
        let now = Utc::now();
        self.get(id).is_some_and(|session| {
            session.authenticated && !session.is_idle(now, self.idle_timeout)
        })
    }

    /// Mark a session as used; an idle session is ended instead
    ///
    /// Returns whether the session is still authenticated.
    pub fn touch(&self, id: &str) -> bool {
        self.touch_at(id, Utc::now())
    }

    fn touch_at(&self, id: &str, now: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let Some(session) = sessions.get_mut(id) else {
            return false;
        };
        if session.is_idle(now, self.idle_timeout) {
            if let Some(session) = sessions.remove(id) {
                end_session(&session, "idle");
            }
            return false;
        }
        session.last_seen = now;
        session.authenticated
    }

    /// End the session if it has gone unused past the idle timeout
    pub fn expire_if_idle(&self, id: &str, now: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let idle = sessions
            .get(id)
            .is_some_and(|session| session.is_idle(now, self.idle_timeout));
        if idle {
            if let Some(session) = sessions.remove(id) {
                end_session(&session, "idle");
            }
        }
        idle
    }

    /// Store a refresh result; false when the session is gone
    pub fn record_refresh(&self, id: &str, at: DateTime<Utc>, snapshot: Dashboard) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match sessions.get_mut(id) {
            Some(session) => {
                session.last_refresh = Some(at);
                session.snapshot = Some(snapshot);
                true
            }
            None => false,
        }
    }

    /// End a session and stop its refresh task
    pub fn remove(&self, id: &str) -> Option<Session> {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        match &removed {
            Some(session) => end_session(session, "logout"),
            None => debug!(session_id = %id, "No session to end"),
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn end_session(session: &Session, reason: &str) {
    session.cancel_token.cancel();
    info!(session_id = %session.id, reason, "Session ended");
}
