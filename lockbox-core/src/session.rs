//! Session handling: binds an authenticated identity to subsequent
//! requests and bounds its lifetime by inactivity.

use crate::{LockboxError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default inactivity window before a session expires (30 minutes)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

struct SessionState {
    user_id: i64,
    last_seen: Instant,
}

/// In-memory session registry.
///
/// One authenticated identity per token; sessions expire after the
/// inactivity window and are the sole authorization mechanism: every
/// entry and folder operation is scoped by the user id a token
/// resolves to.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionState>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store with the default 30-minute inactivity window
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    /// Create a store with a custom inactivity window
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Open a session for an authenticated user and return its token
    pub fn open(&self, user_id: i64) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(
            token.clone(),
            SessionState {
                user_id,
                last_seen: Instant::now(),
            },
        );
        debug!(user_id, "session opened");
        token
    }

    /// Resolve a token to its user id.
    ///
    /// A hit refreshes the inactivity window. Unknown and expired
    /// tokens both fail with the generic [`LockboxError::Auth`];
    /// expired sessions are dropped on observation.
    pub fn resolve(&self, token: &str) -> Result<i64> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get_mut(token) {
            Some(state) if state.last_seen.elapsed() <= self.ttl => {
                state.last_seen = Instant::now();
                Ok(state.user_id)
            }
            Some(_) => {
                sessions.remove(token);
                debug!("session expired");
                Err(LockboxError::Auth)
            }
            None => Err(LockboxError::Auth),
        }
    }

    /// Invalidate a session immediately. Unknown tokens are a no-op.
    pub fn close(&self, token: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if sessions.remove(token).is_some() {
            debug!("session closed");
        }
    }

    /// Drop every session past its inactivity window
    pub fn purge_expired(&self) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, state| state.last_seen.elapsed() <= self.ttl);
    }

    /// Number of live (unexpired) sessions
    pub fn active_count(&self) -> usize {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .values()
            .filter(|s| s.last_seen.elapsed() <= self.ttl)
            .count()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
