//! Analysis Session Lifecycle
//!
//! One session tracks one in-flight analysis run: its repository, goal,
//! accumulated conversation history, and scratch context. The manager holds
//! all live sessions, caps their number by evicting the oldest, and
//! garbage-collects sessions idle past the timeout.
//!
//! Sessions are removed exactly once: `end` reports whether this call was
//! the one that removed the entry, so every exit path of a pipeline run can
//! call it without double-cleanup.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::constants::session::{IDLE_TIMEOUT_SECS, MAX_SESSIONS};
use crate::types::{ChatMessage, SessionId};

/// State of one in-flight analysis run
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    pub repository_path: String,
    pub analysis_goal: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Transcript accumulated across agent calls within this run
    pub conversation_history: Vec<ChatMessage>,
    /// Free-form scratch state stages may hand to each other
    pub current_context: Value,
}

impl Session {
    fn new(repository_path: impl Into<String>, analysis_goal: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(uuid::Uuid::new_v4().to_string()),
            repository_path: repository_path.into(),
            analysis_goal: analysis_goal.into(),
            created_at: now,
            updated_at: now,
            conversation_history: Vec::new(),
            current_context: Value::Null,
        }
    }

    pub fn idle_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.updated_at).num_seconds().max(0) as u64
    }
}

/// Concurrent registry of live sessions
pub struct SessionManager {
    sessions: DashMap<SessionId, Session>,
    max_sessions: usize,
    idle_timeout_secs: u64,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions: MAX_SESSIONS,
            idle_timeout_secs: IDLE_TIMEOUT_SECS,
        }
    }

    /// Manager with explicit capacity and idle-timeout settings
    pub fn with_limits(max_sessions: usize, idle_timeout_secs: u64) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
            idle_timeout_secs,
        }
    }

    /// Create a session, garbage-collecting idle sessions first and
    /// evicting the oldest if the cap is still reached
    pub fn create(
        &self,
        repository_path: impl Into<String>,
        analysis_goal: impl Into<String>,
    ) -> SessionId {
        self.sweep_idle();
        if self.sessions.len() >= self.max_sessions {
            self.evict_oldest();
        }

        let session = Session::new(repository_path, analysis_goal);
        let id = session.session_id.clone();
        info!("Session {} created ({})", id, session.repository_path);
        self.sessions.insert(id.clone(), session);
        id
    }

    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.sessions.get(id).map(|entry| entry.clone())
    }

    /// Append history and refresh the activity timestamp
    pub fn record_turns(&self, id: &SessionId, turns: Vec<ChatMessage>) {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            entry.conversation_history.extend(turns);
            entry.updated_at = Utc::now();
        } else {
            warn!("record_turns on unknown session {}", id);
        }
    }

    /// Replace the scratch context and refresh the activity timestamp
    pub fn update_context(&self, id: &SessionId, context: Value) {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            entry.current_context = context;
            entry.updated_at = Utc::now();
        } else {
            warn!("update_context on unknown session {}", id);
        }
    }

    /// Remove a session. Returns `true` only for the call that actually
    /// removed it, so cleanup runs exactly once across multiple exit paths.
    pub fn end(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            info!("Session {} ended", id);
        } else {
            debug!("Session {} already ended", id);
        }
        removed
    }

    /// Drop every session idle past the timeout. Returns the count removed.
    pub fn sweep_idle(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.idle_secs(now) >= self.idle_timeout_secs)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for id in expired {
            if self.sessions.remove(&id).is_some() {
                info!("Session {} garbage-collected (idle)", id);
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.created_at)
            .map(|entry| entry.key().clone());

        if let Some(id) = oldest
            && self.sessions.remove(&id).is_some()
        {
            warn!("Session cap reached, evicted oldest session {}", id);
        }
    }
}
