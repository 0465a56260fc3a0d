//! Integration tests for the chat orchestrator.
//!
//! These tests verify that:
//! - new and existing sessions accumulate history in user/assistant pairs
//! - caller input is validated before the flow engine is touched
//! - flow engine failures surface classified or wrapped as internal errors
//! - the store stays bounded and concurrent writers keep pairs together

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowrelay_conversation::{ChatService, ConversationConfig};
use flowrelay_core::{Clock, Error, FlowEngine, FlowReply, Result, Role};
use flowrelay_session::{DEFAULT_CAPACITY, SessionStore};

enum Behavior {
    Echo,
    Fail(fn() -> Error),
}

struct StubEngine {
    behavior: Behavior,
    delay: Duration,
    calls: AtomicU32,
}

impl StubEngine {
    fn echo() -> Self {
        Self {
            behavior: Behavior::Echo,
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    fn failing(make: fn() -> Error) -> Self {
        Self {
            behavior: Behavior::Fail(make),
            ..Self::echo()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::echo()
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlowEngine for StubEngine {
    async fn send(&self, message: &str, session_id: &str, _: u32) -> Result<FlowReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.behavior {
            Behavior::Echo => Ok(FlowReply {
                response_text: format!("reply to {message}"),
                session_id: session_id.to_string(),
            }),
            Behavior::Fail(make) => Err(make()),
        }
    }
}

struct SteppingClock {
    base: DateTime<Utc>,
    ticks: AtomicI64,
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + chrono::Duration::seconds(self.ticks.fetch_add(1, Ordering::SeqCst))
    }
}

fn service(engine: Arc<StubEngine>) -> ChatService<Arc<StubEngine>> {
    ChatService::new(
        engine,
        Arc::new(SessionStore::default()),
        ConversationConfig::default(),
    )
}

#[tokio::test]
async fn first_message_creates_session_with_both_turns() {
    let engine = Arc::new(StubEngine::echo());
    let chat = service(engine.clone());

    let response = chat.process_message("hello", None).await;
    let Ok(response) = response else {
        panic!("process_message failed");
    };

    assert_eq!(response.response, "reply to hello");
    assert_eq!(chat.store().len(), 1);

    let history = chat.get_session_history(&response.session_id);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "hello");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, "reply to hello");
    assert_eq!(history[1].id, response.message_id);
    assert_eq!(engine.calls(), 1);
}

#[tokio::test]
async fn known_session_grows_by_two() {
    let chat = service(Arc::new(StubEngine::echo()));
    let session_id = chat.create_session();
    assert!(chat.get_session_history(&session_id).is_empty());

    for round in 1..=3 {
        let response = chat.process_message("again", Some(&session_id)).await;
        assert!(matches!(response, Ok(ref r) if r.session_id == session_id));
        assert_eq!(chat.get_session_history(&session_id).len(), round * 2);
    }
    assert_eq!(chat.store().len(), 1);
}

#[tokio::test]
async fn unknown_session_id_starts_a_new_session() {
    let chat = service(Arc::new(StubEngine::echo()));

    let response = chat.process_message("hi", Some("never-issued")).await;

    assert!(matches!(response, Ok(ref r) if r.session_id != "never-issued"));
    assert!(chat.get_session_history("never-issued").is_empty());
}

#[tokio::test]
async fn history_of_unknown_session_is_empty() {
    let chat = service(Arc::new(StubEngine::echo()));
    assert!(chat.get_session_history("session_missing").is_empty());

    let history = chat.session_history("session_missing");
    assert_eq!(history.session_id, "session_missing");
    assert!(history.messages.is_empty());
}

#[tokio::test]
async fn blank_messages_fail_before_any_network_call() {
    let engine = Arc::new(StubEngine::echo());
    let chat = service(engine.clone());

    for input in ["", "   ", "\n\t "] {
        let result = chat.process_message(input, None).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
    assert_eq!(engine.calls(), 0);
    assert!(chat.store().is_empty());
}

#[tokio::test]
async fn classified_failures_pass_through() {
    let engine = Arc::new(StubEngine::failing(|| Error::Exhausted {
        attempts: 3,
        last: Box::new(Error::Upstream {
            status: 502,
            body: "bad gateway".into(),
        }),
    }));
    let chat = service(engine);

    let result = chat.process_message("hello", None).await;

    assert!(matches!(result, Err(Error::Exhausted { attempts: 3, .. })));
    assert_eq!(result.err().map(|e| e.status_code()), Some(502));
}

#[tokio::test]
async fn unexpected_failures_are_wrapped_as_internal() {
    let engine = Arc::new(StubEngine::failing(|| {
        Error::Configuration("LANGFLOW_API_KEY".into())
    }));
    let chat = service(engine);

    let result = chat.process_message("hello", None).await;

    let Err(err) = result else {
        panic!("expected failure");
    };
    assert!(matches!(err, Error::Internal { .. }));
    assert_eq!(err.to_string(), "Failed to process message");
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn failed_exchange_keeps_user_turn() {
    let chat = service(Arc::new(StubEngine::failing(|| {
        Error::Timeout(Duration::from_secs(30))
    })));
    let session_id = chat.create_session();

    let result = chat.process_message("are you there?", Some(&session_id)).await;

    assert!(matches!(result, Err(Error::Timeout(_))));
    let history = chat.get_session_history(&session_id);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
}

#[tokio::test]
async fn store_stays_bounded_and_drops_oldest() {
    let clock = Arc::new(SteppingClock {
        base: Utc::now(),
        ticks: AtomicI64::new(0),
    });
    let store = Arc::new(SessionStore::with_clock(DEFAULT_CAPACITY, clock));
    let chat = ChatService::new(
        Arc::new(StubEngine::echo()),
        store.clone(),
        ConversationConfig::default(),
    );

    let mut session_ids = Vec::new();
    for i in 0..=DEFAULT_CAPACITY {
        let response = chat.process_message(&format!("message {i}"), None).await;
        let Ok(response) = response else {
            panic!("process_message failed");
        };
        session_ids.push(response.session_id);
    }

    assert_eq!(store.len(), DEFAULT_CAPACITY);
    assert!(chat.get_session_history(&session_ids[0]).is_empty());
    assert!(
        session_ids[1..]
            .iter()
            .all(|id| chat.get_session_history(id).len() == 2)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_messages_for_one_session_keep_pairs_together() {
    let chat = Arc::new(service(Arc::new(StubEngine::slow(Duration::from_millis(
        20,
    )))));
    let session_id = chat.create_session();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let chat = chat.clone();
            let session_id = session_id.clone();
            tokio::spawn(async move {
                chat.process_message(&format!("question {i}"), Some(&session_id))
                    .await
                    .is_ok()
            })
        })
        .collect();
    for handle in handles {
        assert!(matches!(handle.await, Ok(true)));
    }

    let history = chat.get_session_history(&session_id);
    assert_eq!(history.len(), 16);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].content, format!("reply to {}", pair[0].content));
    }
}

#[tokio::test]
async fn failed_exchanges_do_not_grow_the_store() {
    let store = Arc::new(SessionStore::new(2));
    let chat = ChatService::new(
        Arc::new(StubEngine::failing(|| Error::Upstream {
            status: 503,
            body: "unavailable".into(),
        })),
        store.clone(),
        ConversationConfig::default(),
    );

    for i in 0..10 {
        let result = chat
            .process_message("hi", Some(&format!("client-{i}")))
            .await;
        assert!(matches!(result, Err(Error::Upstream { status: 503, .. })));
        assert!(store.len() <= 2);
    }

    assert_eq!(store.len(), 2);
    assert_eq!(chat.tracked_locks(), 0);
}

#[tokio::test]
async fn created_sessions_stay_bounded() {
    let store = Arc::new(SessionStore::new(2));
    let chat = ChatService::new(
        Arc::new(StubEngine::echo()),
        store.clone(),
        ConversationConfig::default(),
    );

    let mut last = String::new();
    for _ in 0..10 {
        last = chat.create_session();
        assert!(store.len() <= 2);
    }

    assert_eq!(store.len(), 2);
    assert!(store.contains(&last));
}

#[tokio::test]
async fn locks_are_kept_only_for_live_sessions() {
    let chat = service(Arc::new(StubEngine::echo()));
    let session_id = chat.create_session();

    assert!(chat.process_message("hi", Some(&session_id)).await.is_ok());
    assert!(chat.process_message("hi", Some("made-up")).await.is_ok());

    assert_eq!(chat.tracked_locks(), 1);
}
