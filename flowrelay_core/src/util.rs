//! Identifier generation and the wall-clock seam used by the session store.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of "now" for session bookkeeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Opaque session identifier.
///
/// UUID v7 carries a millisecond timestamp followed by random bits, so ids are
/// unique with overwhelming probability and mean nothing beyond that.
#[must_use]
pub fn new_session_id() -> String {
    format!("session_{}", Uuid::now_v7().simple())
}

#[must_use]
pub fn new_message_id() -> String {
    format!("msg_{}", Uuid::now_v7().simple())
}
