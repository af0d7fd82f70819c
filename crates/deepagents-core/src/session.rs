//! Conversation sessions and the persistence trait used to resume them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::messaging::AgentMessage;

/// Unique identifier for a conversation session.
pub type SessionId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<AgentMessage>,
}

impl Session {
    pub fn new(model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            model: model.into(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        }
    }

    /// Replace the history and bump `updated_at`.
    pub fn record(&mut self, messages: Vec<AgentMessage>) {
        self.messages = messages;
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            model: self.model.clone(),
            updated_at: self.updated_at,
            message_count: self.messages.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub model: String,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Persists sessions between CLI runs.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: &Session) -> anyhow::Result<()>;

    /// Returns None if no session with this ID exists.
    async fn load(&self, id: &SessionId) -> anyhow::Result<Option<Session>>;

    /// Most recently updated session, if any.
    async fn latest(&self) -> anyhow::Result<Option<Session>>;

    /// Summaries ordered newest first.
    async fn list(&self) -> anyhow::Result<Vec<SessionSummary>>;
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: std::sync::RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on session store"))?;
        sessions.insert(session.id.clone(), session.clone());
        tracing::debug!(session_id = %session.id, "Saved session to memory");
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> anyhow::Result<Option<Session>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on session store"))?;
        Ok(sessions.get(id).cloned())
    }

    async fn latest(&self) -> anyhow::Result<Option<Session>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on session store"))?;
        Ok(sessions.values().max_by_key(|s| s.updated_at).cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<SessionSummary>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on session store"))?;
        let mut summaries: Vec<_> = sessions.values().map(Session::summary).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}
