use std::time::Duration;

use async_trait::async_trait;
use flowrelay_core::{Error, FlowEngine, FlowReply, Result};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::extract::extract_response_text;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper, run_with_retry};

/// HTTP client for the flow engine's run endpoint.
pub struct LangflowClient<S = TokioSleeper> {
    client: Client,
    base_url: String,
    flow_id: String,
    api_key: String,
    hf_token: Option<String>,
    request_timeout: Duration,
    base_delay: Duration,
    sleeper: S,
}

impl LangflowClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

    /// Fails with [`Error::Configuration`] when any mandatory value is blank.
    pub fn new(
        base_url: impl Into<String>,
        flow_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let base_url = required("LANGFLOW_BASE_URL", base_url.into())?;
        let flow_id = required("FLOW_ID", flow_id.into())?;
        let api_key = required("LANGFLOW_API_KEY", api_key.into())?;

        info!("Creating LangflowClient for flow {}", flow_id);
        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            flow_id,
            api_key,
            hf_token: None,
            request_timeout: Self::DEFAULT_TIMEOUT,
            base_delay: RetryPolicy::DEFAULT_BASE_DELAY,
            sleeper: TokioSleeper,
        })
    }
}

impl<S: Sleeper> LangflowClient<S> {
    /// Sent as `Authorization: Bearer <token>` when present and non-blank.
    #[must_use]
    pub fn with_hf_token(mut self, hf_token: Option<String>) -> Self {
        self.hf_token = hf_token.filter(|t| !t.trim().is_empty());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Replace the backoff sleeper.
    #[must_use]
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> LangflowClient<T> {
        LangflowClient {
            client: self.client,
            base_url: self.base_url,
            flow_id: self.flow_id,
            api_key: self.api_key,
            hf_token: self.hf_token,
            request_timeout: self.request_timeout,
            base_delay: self.base_delay,
            sleeper,
        }
    }

    #[must_use]
    pub fn run_url(&self) -> String {
        format!("{}/api/v1/run/{}", self.base_url, self.flow_id)
    }

    /// One attempt: POST, status check, then extraction.
    async fn try_send(&self, request: &Value, session_id: &str) -> Result<FlowReply> {
        let mut builder = self
            .client
            .post(self.run_url())
            .header("x-api-key", &self.api_key)
            .timeout(self.request_timeout)
            .json(request);
        if let Some(token) = &self.hf_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = serde_json::from_str(&body).map_err(|e| {
            error!("Flow engine returned a non-JSON body: {body}");
            Error::MalformedResponse(format!("invalid JSON: {e}"))
        })?;

        let Some((strategy, text)) = extract_response_text(&payload) else {
            let pretty = serde_json::to_string_pretty(&payload).unwrap_or(body);
            error!("Unexpected flow engine response format: {pretty}");
            return Err(Error::MalformedResponse(if payload.is_null() {
                "no data received".to_string()
            } else {
                "no reply text in any known shape".to_string()
            }));
        };
        debug!("Extracted reply using {:?}", strategy);

        let session_id = payload
            .get("session_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(session_id);

        Ok(FlowReply {
            response_text: text.to_string(),
            session_id: session_id.to_string(),
        })
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.request_timeout)
        } else {
            Error::Network(err.into())
        }
    }
}

fn required(name: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::Configuration(name.to_string()));
    }
    Ok(value.trim().to_string())
}

#[async_trait]
impl<S: Sleeper> FlowEngine for LangflowClient<S> {
    async fn send(
        &self,
        message: &str,
        session_id: &str,
        max_attempts: u32,
    ) -> Result<FlowReply> {
        let request = json!({
            "input_value": message,
            "output_type": "chat",
            "input_type": "chat",
            "session_id": session_id,
            "tweaks": null,
        });

        info!("Sending request to flow engine: session={}", session_id);

        let policy = RetryPolicy::new(max_attempts).with_base_delay(self.base_delay);
        let reply = run_with_retry(&policy, &self.sleeper, |_| {
            self.try_send(&request, session_id)
        })
        .await?;

        info!("Received response from flow engine");
        Ok(reply)
    }
}
