//! Server application state

use crate::contract::PromptContract;
use crate::llm::ClientFactory;
use crate::session::ChatSession;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Sessions unused for this long are dropped.
pub const DEFAULT_SESSION_IDLE_MINUTES: i64 = 60;

/// One chat session, locked for the whole of each request so a turn runs
/// to completion before the next one in the same session starts.
pub type SessionHandle = Arc<Mutex<ChatSession>>;

struct SessionEntry {
    handle: SessionHandle,
    last_used: DateTime<Utc>,
}

/// Shared application state for all route handlers
pub struct AppState {
    pub contract: Arc<PromptContract>,
    pub factory: Arc<dyn ClientFactory>,
    idle_timeout: Duration,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(contract: Arc<PromptContract>, factory: Arc<dyn ClientFactory>) -> SharedState {
        Self::with_idle_timeout(contract, factory, Duration::minutes(DEFAULT_SESSION_IDLE_MINUTES))
    }

    pub fn with_idle_timeout(
        contract: Arc<PromptContract>,
        factory: Arc<dyn ClientFactory>,
        idle_timeout: Duration,
    ) -> SharedState {
        Arc::new(Self {
            contract,
            factory,
            idle_timeout,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    fn is_expired(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.last_used) > self.idle_timeout
    }

    /// Start a fresh session and return its handle. Idle sessions are
    /// swept at the same time.
    pub async fn create_session(&self) -> SessionHandle {
        let session = ChatSession::new(Arc::clone(&self.contract));
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::info!(swept, "Dropped idle sessions");
        }
        sessions.insert(
            id,
            SessionEntry {
                handle: Arc::clone(&handle),
                last_used: now,
            },
        );
        tracing::info!(session = %id, "Session created");
        handle
    }

    /// Look up a live session and mark it used. An idle session is dropped
    /// and reported as missing.
    pub async fn session(&self, id: &Uuid) -> Option<SessionHandle> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let expired = self.is_expired(sessions.get(id)?, now);
        if expired {
            sessions.remove(id);
            tracing::info!(session = %id, "Session expired");
            return None;
        }
        let entry = sessions.get_mut(id)?;
        entry.last_used = now;
        Some(Arc::clone(&entry.handle))
    }

    pub async fn remove_session(&self, id: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "Session closed");
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
