//! Per-caller authentication sessions
//!
//! Each HTTP caller identifies its session with the `x-calmate-session`
//! header. The session holds the pending device-code flow between requests;
//! its mutex serializes requests of the same caller so a flow is never
//! started twice.
//!
//! Only sessions with a live device-code flow are kept. A session is released
//! when a request leaves it without a pending flow, and sessions whose flow
//! expired without being polled again are swept on the next `resolve`.

use std::sync::Arc;

use calmate_core::{AuthSession, Clock};
use calmate_domain::{CalmateError, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Shared handle to one caller's session
pub type SharedSession = Arc<Mutex<AuthSession>>;

/// Live sessions keyed by id
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SharedSession>,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    /// Empty registry judging flow expiry by `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { sessions: DashMap::new(), clock }
    }

    /// Session for the supplied header value, creating it when absent.
    ///
    /// A missing header allocates a fresh id. An unknown but well-formed id
    /// is adopted as-is, so a client may pick its own.
    ///
    /// # Errors
    /// Returns `CalmateError::InvalidInput` if the header is not a UUID.
    pub fn resolve(&self, header: Option<&str>) -> Result<(Uuid, SharedSession)> {
        let id = match header.map(str::trim).filter(|value| !value.is_empty()) {
            Some(raw) => parse_session_id(raw)?,
            None => Uuid::new_v4(),
        };

        self.sweep_abandoned(id);
        let session = self.sessions.entry(id).or_default().clone();
        Ok((id, session))
    }

    /// Existing session for the header value, without creating one.
    ///
    /// # Errors
    /// Returns `CalmateError::InvalidInput` if the header is not a UUID.
    pub fn find(&self, header: Option<&str>) -> Result<Option<(Uuid, SharedSession)>> {
        let Some(raw) = header.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(None);
        };
        let id = parse_session_id(raw)?;
        Ok(self.sessions.get(&id).map(|entry| (id, entry.clone())))
    }

    /// Forget `id` unless it still has a pending flow or another request
    /// holds it. Call after dropping the handle from `resolve`/`find`.
    pub fn release(&self, id: Uuid) {
        if self.sessions.remove_if(&id, |_, session| is_idle(session)).is_some() {
            debug!(session_id = %id, "Session released");
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop unused sessions whose flow has expired, except `keep`, which is
    /// about to be used and reports the expiry itself.
    fn sweep_abandoned(&self, keep: Uuid) {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions.retain(|id, session| *id == keep || !is_abandoned(session, now));
        let swept = before.saturating_sub(self.sessions.len());
        if swept > 0 {
            debug!(swept, "Swept abandoned sessions");
        }
    }
}

/// Unused by any request and without a pending flow.
fn is_idle(session: &SharedSession) -> bool {
    Arc::strong_count(session) == 1
        && session.try_lock().is_ok_and(|guard| !guard.has_pending_flow())
}

/// Unused by any request and with no flow left that could still complete.
fn is_abandoned(session: &SharedSession, now: DateTime<Utc>) -> bool {
    Arc::strong_count(session) == 1
        && session
            .try_lock()
            .is_ok_and(|guard| guard.pending_flow().map_or(true, |flow| flow.is_expired(now)))
}

fn parse_session_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| CalmateError::InvalidInput(format!("invalid session id: {e}")))
}
