#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;
pub mod util;

pub use error::{Error, Result};
pub use util::{Clock, SystemClock, new_message_id, new_session_id};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: String) -> Self {
        Self {
            id: new_message_id(),
            content,
            role,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into())
    }
}

/// Conversation state held by the session store.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a message and bump `last_activity`, never moving it before
    /// `created_at`.
    pub fn push(&mut self, message: Message, now: DateTime<Utc>) {
        self.messages.push(message);
        self.last_activity = now.max(self.created_at);
    }

    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Result of one successful round trip to the flow engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReply {
    pub response_text: String,
    pub session_id: String,
}

/// Response descriptor handed back for a processed chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub message_id: String,
}

/// History descriptor for a session lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistory {
    pub session_id: String,
    pub messages: Vec<Message>,
}

/// Delivers one chat message to a remote flow engine.
#[async_trait]
pub trait FlowEngine: Send + Sync {
    /// Send `message` for `session_id`, making at most `max_attempts` tries.
    async fn send(&self, message: &str, session_id: &str, max_attempts: u32)
    -> Result<FlowReply>;
}

#[async_trait]
impl<T: FlowEngine + ?Sized> FlowEngine for Arc<T> {
    async fn send(
        &self,
        message: &str,
        session_id: &str,
        max_attempts: u32,
    ) -> Result<FlowReply> {
        (**self).send(message, session_id, max_attempts).await
    }
}
