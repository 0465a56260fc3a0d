use flowrelay_config::Config;

/// Strategy for displaying the resolved configuration.
///
/// Shows the merged result of the config file and environment, with the API
/// key masked, and whether the mandatory flow engine settings are present.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== flowrelay Configuration ===\n");

        println!("Config File:");
        let path = Config::config_path()?;
        let state = if path.exists() { "found" } else { "not found" };
        println!("  {} ({state})", path.display());
        println!();

        println!("Flow Engine:");
        println!("  Base URL: {}", or_unset(&config.langflow.base_url));
        println!("  Flow ID: {}", or_unset(&config.langflow.flow_id));
        if config.langflow.api_key.is_empty() {
            println!("  API Key: (not set)");
        } else {
            println!("  API Key: {}", config.langflow.masked_api_key());
        }
        let hf = if config.langflow.hf_token.is_some() { "set" } else { "(not set)" };
        println!("  HF Token: {hf}");
        println!("  Request Timeout: {}ms", config.langflow.request_timeout_ms);
        println!("  Max Attempts: {}", config.langflow.max_attempts);
        println!();

        println!("Server:");
        println!("  Listen: {}:{}", config.server.host, config.server.port);
        println!(
            "  CORS Origin: {}",
            config.server.cors_origin.as_deref().unwrap_or("*")
        );
        println!();

        println!("Sessions:");
        println!("  Capacity: {}", config.sessions.capacity);
        println!();

        match config.validate() {
            Ok(()) => println!("Status: ready"),
            Err(e) => println!("Status: {e}"),
        }

        Ok(())
    }
}

fn or_unset(value: &str) -> &str {
    if value.trim().is_empty() { "(not set)" } else { value }
}
