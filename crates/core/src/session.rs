//! Session transcript — the persisted blob a [`crate::traits::SessionStore`]
//! reads and writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub source_kind: Option<String>,
    /// The raw, unaltered transcript — never the compressed projection
    /// built for an LLM call (spec.md §3 invariant).
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(source_name: Option<String>, source_kind: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_name,
            source_kind,
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}
