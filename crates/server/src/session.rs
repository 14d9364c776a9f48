//! Session tracking for the stateful Streamable HTTP mode.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Header carrying the session id in both directions.
pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub protocol_version: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: Instant,
}

#[derive(Debug, thiserror::Error)]
#[error("Session limit of {0} reached")]
pub struct SessionLimitReached(pub usize);

/// Sessions created by `initialize`. A session ends when the client deletes
/// it or when it has been idle for longer than the idle timeout.
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
            max_sessions,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub async fn create(
        &self,
        protocol_version: impl Into<String>,
    ) -> Result<Session, SessionLimitReached> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        if sessions.len() >= self.max_sessions {
            let evicted = evict_idle(&mut sessions, now, self.idle_timeout);
            if evicted > 0 {
                tracing::debug!(evicted, "Evicted idle sessions");
            }
        }
        if sessions.len() >= self.max_sessions {
            tracing::warn!(max = self.max_sessions, "Refusing new session, limit reached");
            return Err(SessionLimitReached(self.max_sessions));
        }

        let session = Session {
            id: Uuid::new_v4().to_string(),
            protocol_version: protocol_version.into(),
            created_at: Utc::now(),
            last_seen: now,
        };
        sessions.insert(session.id.clone(), session.clone());
        tracing::debug!(session = %session.id, "Session created");
        Ok(session)
    }

    /// Look up a live session without refreshing it.
    pub async fn get(&self, id: &str) -> Option<Session> {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .get(id)
            .filter(|s| !is_idle(s, now, self.idle_timeout))
            .cloned()
    }

    /// Look up a live session and mark it as used. Expired sessions are dropped.
    pub async fn touch(&self, id: &str) -> Option<Session> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        if sessions
            .get(id)
            .is_some_and(|s| is_idle(s, now, self.idle_timeout))
        {
            sessions.remove(id);
            tracing::debug!(session = %id, "Session expired");
            return None;
        }

        let session = sessions.get_mut(id)?;
        session.last_seen = now;
        Some(session.clone())
    }

    /// Returns whether the session existed.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(session = %id, "Session terminated");
        }
        removed
    }

    /// Drop every session idle for longer than the timeout.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        evict_idle(&mut sessions, Instant::now(), self.idle_timeout)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Periodically evict idle sessions until the task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(manager.idle_timeout);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let evicted = manager.evict_idle().await;
                if evicted > 0 {
                    tracing::info!(evicted, "Evicted idle sessions");
                }
            }
        })
    }
}

fn is_idle(session: &Session, now: Instant, idle_timeout: Duration) -> bool {
    now.saturating_duration_since(session.last_seen) > idle_timeout
}

fn evict_idle(sessions: &mut HashMap<String, Session>, now: Instant, idle_timeout: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, s| !is_idle(s, now, idle_timeout));
    before - sessions.len()
}
