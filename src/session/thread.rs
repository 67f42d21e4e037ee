//! Append-only conversation threads.
//!
//! A [`Session`] holds the linear turn history for one conversation. History
//! is replayed in full on every model call — no server-side session state is
//! assumed — so the session is the single source of truth for a thread.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::llm::{Message, MessageRole};

/// A single conversation.
///
/// Cheap to clone; clones share the same underlying history. Turns are
/// append-only: the orchestrator commits a whole turn (user, optional tool
/// round, assistant) at once via [`Session::append_messages`].
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    messages: RwLock<Vec<Message>>,
    created_at: DateTime<Utc>,
    system_prompt: RwLock<Option<String>>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                messages: RwLock::new(Vec::new()),
                created_at: Utc::now(),
                system_prompt: RwLock::new(None),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Set the system prompt prepended to every replay.
    pub fn set_system_prompt(&self, prompt: impl Into<String>) {
        *self.inner.system_prompt.write().unwrap() = Some(prompt.into());
    }

    #[must_use]
    pub fn system_prompt(&self) -> Option<String> {
        self.inner.system_prompt.read().unwrap().clone()
    }

    /// Append a batch of turns atomically, preserving their order.
    pub fn append_messages(&self, messages: Vec<Message>) {
        self.inner.messages.write().unwrap().extend(messages);
    }

    /// All turns in order, without the system prompt.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.messages.read().unwrap().clone()
    }

    /// All turns with the system prompt (if set) prepended.
    #[must_use]
    pub fn messages_with_system(&self) -> Vec<Message> {
        let mut result = Vec::new();
        if let Some(prompt) = self.system_prompt() {
            result.push(Message::system(prompt));
        }
        result.extend(self.messages());
        result
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.inner.messages.read().unwrap().len()
    }
}

/// Thread-safe store of sessions, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session with a fresh id.
    #[must_use]
    pub fn create(&self) -> Session {
        self.create_with_id(Uuid::new_v4().to_string())
    }

    /// Create a new session with a specific id.
    #[must_use]
    pub fn create_with_id(&self, id: impl Into<String>) -> Session {
        let id = id.into();
        let session = Session::new(id.clone());
        self.sessions.write().unwrap().insert(id, session.clone());
        session
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().unwrap().get(id).cloned()
    }

    /// Get a session by id, creating it if absent.
    #[must_use]
    pub fn get_or_create(&self, id: &str) -> Session {
        if let Some(session) = self.get(id) {
            return session;
        }
        self.create_with_id(id)
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.write().unwrap().remove(id)
    }

    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.sessions.read().unwrap().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
