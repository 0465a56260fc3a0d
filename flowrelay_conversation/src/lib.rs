#![warn(
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

//! Conversation orchestration on top of the session store and flow engine.
//!
//! # Key Features
//! - Sessions resolved or created per message
//! - Both sides of every exchange recorded in order
//! - Per-session serialization of concurrent requests
//! - Capacity-bounded history with least-recently-active eviction

mod locks;
mod service;

pub use locks::SessionLocks;
pub use service::{ChatService, ConversationConfig};
