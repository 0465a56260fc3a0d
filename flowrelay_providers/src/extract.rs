//! Reply-text extraction from flow engine payloads.
//!
//! The run endpoint nests the generated text differently depending on how the
//! flow is configured, so each known envelope is an extraction strategy tried
//! in priority order.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// `outputs[0].outputs[0].results.message.text`
    ResultsMessageText,
    /// `outputs[0].outputs[0].outputs.message.message`
    OutputsMessage,
    /// `outputs[0].outputs[0].messages[0].message`
    FirstMessage,
}

impl ExtractionStrategy {
    /// Priority order; the first strategy yielding non-empty text wins.
    pub const ORDERED: [Self; 3] = [
        Self::ResultsMessageText,
        Self::OutputsMessage,
        Self::FirstMessage,
    ];

    #[must_use]
    pub const fn pointer(self) -> &'static str {
        match self {
            Self::ResultsMessageText => "/outputs/0/outputs/0/results/message/text",
            Self::OutputsMessage => "/outputs/0/outputs/0/outputs/message/message",
            Self::FirstMessage => "/outputs/0/outputs/0/messages/0/message",
        }
    }

    /// `None` when this envelope is absent or carries no text.
    #[must_use]
    pub fn extract(self, payload: &Value) -> Option<&str> {
        payload
            .pointer(self.pointer())
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
    }
}

/// Run every strategy in order and report which one matched.
#[must_use]
pub fn extract_response_text(payload: &Value) -> Option<(ExtractionStrategy, &str)> {
    ExtractionStrategy::ORDERED
        .into_iter()
        .find_map(|strategy| strategy.extract(payload).map(|text| (strategy, text)))
}
