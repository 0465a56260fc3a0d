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

//! Outbound call protocol to the flow engine: request construction,
//! per-attempt timeouts, exponential backoff and reply extraction.

pub mod extract;
mod langflow;
pub mod retry;

pub use extract::{ExtractionStrategy, extract_response_text};
pub use langflow::LangflowClient;
pub use retry::{RetryPolicy, RetryState, Sleeper, TokioSleeper, run_with_retry};
