use flowrelay_config::Config;
use flowrelay_server::AppState;
use tracing::info;

use super::init_chat_service;

/// Input parameters for the Serve command strategy.
#[derive(Debug, Clone)]
pub struct ServeInput {
    /// Host override
    pub host: Option<String>,
    /// Port override
    pub port: Option<u16>,
}

/// Strategy for running the HTTP server.
///
/// Configuration problems stop the process here, before any request is
/// accepted.
#[derive(Debug, Clone, Copy)]
pub struct ServeStrategy;

impl super::CommandStrategy for ServeStrategy {
    type Input = ServeInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let chat = init_chat_service(&config)?;

        let host = input.host.unwrap_or_else(|| config.server.host.clone());
        let port = input.port.unwrap_or(config.server.port);
        let listener = flowrelay_server::bind(&host, port).await?;

        let state = AppState::new(chat, config.langflow.is_configured());
        info!("Starting flowrelay server on {host}:{port}");

        flowrelay_server::serve(listener, state, config.server.cors_origin.as_deref()).await
    }
}
