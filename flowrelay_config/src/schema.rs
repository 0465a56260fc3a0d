use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use flowrelay_core::Error;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub langflow: LangflowConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LangflowConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub flow_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hf_token: Option<String>,
    #[serde(default = "LangflowConfig::default_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "LangflowConfig::default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for LangflowConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            flow_id: String::new(),
            api_key: String::new(),
            hf_token: None,
            request_timeout_ms: Self::default_timeout_ms(),
            max_attempts: Self::default_max_attempts(),
        }
    }
}

impl LangflowConfig {
    const fn default_timeout_ms() -> u64 {
        30_000
    }

    const fn default_max_attempts() -> u32 {
        3
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
    }

    /// API key with everything but the last four characters hidden.
    #[must_use]
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{visible}", "*".repeat(chars.len() - 4))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            cors_origin: None,
        }
    }
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    const fn default_port() -> u16 {
        3001
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionsConfig {
    #[serde(default = "SessionsConfig::default_capacity")]
    pub capacity: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
        }
    }
}

impl SessionsConfig {
    const fn default_capacity() -> usize {
        100
    }
}

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("flowrelay"))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Defaults, then `~/flowrelay/config.json` if present, then environment
    /// variables. Mandatory values are checked with [`Config::validate`].
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = serde_json::from_str(&content)?;
            tracing::info!("Loaded config from {}", config_path.display());
            config
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from an environment lookup. Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LANGFLOW_BASE_URL") {
            self.langflow.base_url = v;
        }
        if let Some(v) = get("FLOW_ID") {
            self.langflow.flow_id = v;
        }
        if let Some(v) = get("LANGFLOW_API_KEY") {
            self.langflow.api_key = v;
        }
        if let Some(v) = get("HF_TOKEN") {
            self.langflow.hf_token = Some(v);
        }
        if let Some(v) = get("REQUEST_TIMEOUT_MS") {
            self.langflow.request_timeout_ms = parse("REQUEST_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("FLOW_MAX_ATTEMPTS") {
            self.langflow.max_attempts = parse("FLOW_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse("PORT", &v)?;
        }
        if let Some(v) = get("CORS_ORIGIN") {
            self.server.cors_origin = Some(v);
        }
        if let Some(v) = get("SESSION_CAPACITY") {
            self.sessions.capacity = parse("SESSION_CAPACITY", &v)?;
        }
        Ok(())
    }

    /// Reject configurations the flow client cannot work with.
    pub fn validate(&self) -> Result<(), Error> {
        let missing: Vec<&str> = [
            ("LANGFLOW_BASE_URL", &self.langflow.base_url),
            ("FLOW_ID", &self.langflow.flow_id),
            ("LANGFLOW_API_KEY", &self.langflow.api_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(Error::Configuration(missing.join(", ")));
        }
        if self.langflow.max_attempts == 0 {
            return Err(Error::Configuration(
                "FLOW_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let config_template = r#"{
  "langflow": {
    "base_url": "http://localhost:7860",
    "flow_id": "your-flow-id-here",
    "api_key": "your-langflow-api-key-here",
    "request_timeout_ms": 30000,
    "max_attempts": 3
  },
  "server": {
    "host": "0.0.0.0",
    "port": 3001
  },
  "sessions": {
    "capacity": 100
  }
}"#;

        std::fs::write(&config_path, config_template)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Edit the config file and add your flow id and Langflow API key");
        println!("   2. Optionally set HF_TOKEN for flows hosted behind Hugging Face auth");
        println!("   3. Run 'flowrelay serve' to start the HTTP server");
        println!();
        println!("🔧 Environment variables override the file:");
        println!("   LANGFLOW_BASE_URL, FLOW_ID, LANGFLOW_API_KEY, HF_TOKEN, PORT, HOST,");
        println!("   SESSION_CAPACITY, FLOW_MAX_ATTEMPTS, REQUEST_TIMEOUT_MS, CORS_ORIGIN");
        println!();
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid value for {key}: {value} ({e})"))
}
