use flowrelay_config::Config;
use tracing::info;

use super::init_chat_service;

/// Input parameters for the Send command strategy.
#[derive(Debug, Clone)]
pub struct SendInput {
    /// Message to send
    pub message: String,
    /// Session to continue; a new one is started when absent
    pub session_id: Option<String>,
}

/// Strategy for sending a single message through the orchestrator.
///
/// Useful for checking a flow end to end without running the server.
#[derive(Debug, Clone, Copy)]
pub struct SendStrategy;

impl super::CommandStrategy for SendStrategy {
    type Input = SendInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let chat = init_chat_service(&config)?;

        let response = chat
            .process_message(&input.message, input.session_id.as_deref())
            .await?;

        info!(
            "Session {} message {}",
            response.session_id, response.message_id
        );
        println!("{}", response.response);
        Ok(())
    }
}
