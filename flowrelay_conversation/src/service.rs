//! Chat orchestration: session resolution, the flow engine round trip and
//! history bookkeeping for each inbound message.

use std::sync::Arc;

use flowrelay_core::{
    ChatResponse, Error, FlowEngine, Message, Result, SessionHistory,
};
use flowrelay_session::SessionStore;
use tracing::{debug, error, info};

use crate::locks::SessionLocks;

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Attempts allowed per flow engine call, first try included.
    pub max_attempts: u32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl ConversationConfig {
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Composes the session store and the flow engine into the chat operations
/// exposed to callers.
pub struct ChatService<E = Arc<dyn FlowEngine>>
where
    E: FlowEngine,
{
    engine: E,
    store: Arc<SessionStore>,
    locks: SessionLocks,
    config: ConversationConfig,
}

impl<E: FlowEngine> ChatService<E> {
    pub fn new(engine: E, store: Arc<SessionStore>, config: ConversationConfig) -> Self {
        info!(
            "Creating chat service (max_attempts={}, capacity={})",
            config.max_attempts,
            store.capacity()
        );
        Self {
            engine,
            store,
            locks: SessionLocks::new(),
            config,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Send one user message through the flow engine and record both sides
    /// of the exchange.
    pub async fn process_message(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse> {
        let result = self
            .process_message_inner(message, session_id)
            .await
            .inspect_err(|e| error!("Error processing message: {e}"));
        self.prune_locks();
        result
    }

    async fn process_message_inner(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse> {
        if message.trim().is_empty() {
            return Err(Error::Validation("Message cannot be empty".to_string()));
        }

        let _guard = match session_id {
            Some(id) => Some(self.locks.acquire(id).await),
            None => None,
        };

        let session = self.store.get_or_create(session_id);
        let user_message = Message::user(message);
        self.store.append(&session.id, user_message);

        info!(
            "Processing message for session {}: {}...",
            session.id,
            preview(message, 100)
        );

        let reply = self
            .engine
            .send(message, &session.id, self.config.max_attempts)
            .await
            .map_err(|e| {
                if e.is_caller_facing() {
                    e
                } else {
                    Error::internal(e)
                }
            })?;

        if reply.session_id != session.id {
            debug!(
                "Flow engine answered under session {} for {}",
                reply.session_id, session.id
            );
        }

        let assistant_message = Message::assistant(reply.response_text.clone());
        let message_id = assistant_message.id.clone();
        self.store.append(&session.id, assistant_message);

        self.store.evict_if_over_capacity();

        Ok(ChatResponse {
            response: reply.response_text,
            session_id: session.id,
            message_id,
        })
    }

    /// Messages recorded for `session_id`; empty when the session is unknown.
    #[must_use]
    pub fn get_session_history(&self, session_id: &str) -> Vec<Message> {
        self.store
            .get(session_id)
            .map(|session| session.messages)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn session_history(&self, session_id: &str) -> SessionHistory {
        SessionHistory {
            session_id: session_id.to_string(),
            messages: self.get_session_history(session_id),
        }
    }

    /// Start an empty session and hand back its id.
    pub fn create_session(&self) -> String {
        let id = self.store.create().id;
        self.prune_locks();
        id
    }

    /// Drop lock entries for ids that are not live sessions, such as evicted
    /// sessions or ids a client made up.
    fn prune_locks(&self) {
        self.locks.prune(|id| self.store.contains(id));
    }

    #[must_use]
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }
}

fn preview(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(idx, _)| &text[..idx])
}
