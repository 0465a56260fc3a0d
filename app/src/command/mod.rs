//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use std::sync::Arc;
use std::time::Duration;

use flowrelay_config::Config;
use flowrelay_conversation::{ChatService, ConversationConfig};
use flowrelay_core::FlowEngine;
use flowrelay_providers::LangflowClient;
use flowrelay_session::SessionStore;
use tracing::info;

mod info;
mod init;
mod send;
mod serve;
mod version;

pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use send::{SendInput, SendStrategy};
pub use serve::{ServeInput, ServeStrategy};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Load and validate configuration, then wire the flow client, session store
/// and orchestrator together.
fn init_chat_service(config: &Config) -> anyhow::Result<Arc<ChatService>> {
    config.validate()?;

    let langflow = &config.langflow;
    let client = LangflowClient::new(&langflow.base_url, &langflow.flow_id, &langflow.api_key)?
        .with_hf_token(langflow.hf_token.clone())
        .with_timeout(Duration::from_millis(langflow.request_timeout_ms));
    let engine: Arc<dyn FlowEngine> = Arc::new(client);

    let store = Arc::new(SessionStore::new(config.sessions.capacity));
    let conversation_config =
        ConversationConfig::default().with_max_attempts(langflow.max_attempts);

    info!(
        "Flow engine at {} (flow {}), session capacity {}",
        langflow.base_url, langflow.flow_id, config.sessions.capacity
    );

    Ok(Arc::new(ChatService::new(
        engine,
        store,
        conversation_config,
    )))
}
