//! In-memory conversation histories keyed by session identifier.

use std::collections::HashMap;

use crate::core::message::Message;

/// Session selected when neither flag nor config names one.
pub const DEFAULT_SESSION_ID: &str = "abc123";

/// Ordered, append-only history of one conversation.
#[derive(Debug, Default, Clone)]
pub struct SessionHistory {
    messages: Vec<Message>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appending is the only mutation a history supports.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

/// Process-lifetime map from session identifier to conversation history.
///
/// Histories are created lazily on first access and live until [`clear_all`]
/// drops every entry at once. There is no TTL and no per-session eviction.
///
/// [`clear_all`]: SessionStore::clear_all
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, SessionHistory>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the history for `session_id`, registering an empty one if the
    /// identifier has not been seen before.
    pub fn get_or_create(&mut self, session_id: &str) -> &mut SessionHistory {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionHistory::new)
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionHistory> {
        self.sessions.get(session_id)
    }

    /// Drops every session at once.
    pub fn clear_all(&mut self) {
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
