use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use flowrelay_core::{Clock, Message, Session, SystemClock, new_session_id};
use tracing::{debug, info};

/// Upper bound on live sessions before the least recently active are dropped.
pub const DEFAULT_CAPACITY: usize = 100;

/// In-memory conversation state, bounded in session count.
///
/// The map sits behind a synchronous lock that is never held across an
/// `.await`, so each operation (eviction included) is one critical section.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        info!("SessionStore initialized with capacity {}", capacity);
        Self {
            sessions: Mutex::new(HashMap::new()),
            capacity,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of a session, without touching its activity.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.lock().get(id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Return the known session for `id`, or create an empty one under a
    /// freshly generated id when `id` is absent or unknown.
    ///
    /// Creating a session enforces capacity in the same critical section,
    /// with the new session always kept.
    pub fn get_or_create(&self, id: Option<&str>) -> Session {
        let mut sessions = self.lock();
        if let Some(existing) = id.and_then(|id| sessions.get(id)) {
            return existing.clone();
        }
        if let Some(unknown) = id {
            debug!("Unknown session {}, starting a new one", unknown);
        }
        let session = Session::new(Self::unused_id(&sessions), self.clock.now());
        sessions.insert(session.id.clone(), session.clone());
        info!("Created new session: {}", session.id);
        self.evict_locked(&mut sessions, Some(&session.id));
        session
    }

    /// Create an empty session regardless of any existing ones.
    pub fn create(&self) -> Session {
        self.get_or_create(None)
    }

    /// Append one message and bump the session's activity.
    ///
    /// A session evicted since it was resolved is recreated under the same
    /// id so the exchange is not lost.
    pub fn append(&self, id: &str, message: Message) {
        let now = self.clock.now();
        let mut sessions = self.lock();
        let session = sessions.entry(id.to_string()).or_insert_with(|| {
            debug!("Session {} was evicted mid-exchange, recreating", id);
            Session::new(id.to_string(), now)
        });
        session.push(message, now);
    }

    /// Append a user/assistant pair in order, then enforce capacity.
    pub fn record_exchange(&self, id: &str, user: Message, assistant: Message) {
        self.append(id, user);
        self.append(id, assistant);
        self.evict_if_over_capacity();
    }

    /// Keep the `capacity` most recently active sessions and drop the rest.
    ///
    /// Ties on `last_activity` are broken by ascending id. Returns the number
    /// of sessions removed.
    pub fn evict_if_over_capacity(&self) -> usize {
        let mut sessions = self.lock();
        self.evict_locked(&mut sessions, None)
    }

    /// Ranking behind [`SessionStore::evict_if_over_capacity`]; `keep` ranks
    /// ahead of every other session.
    fn evict_locked(&self, sessions: &mut HashMap<String, Session>, keep: Option<&str>) -> usize {
        if sessions.len() <= self.capacity {
            return 0;
        }

        let mut ranked: Vec<(&String, &Session)> = sessions.iter().collect();
        ranked.sort_by(|(a_id, a), (b_id, b)| {
            let a_kept = keep == Some(a_id.as_str());
            let b_kept = keep == Some(b_id.as_str());
            b_kept
                .cmp(&a_kept)
                .then_with(|| b.last_activity.cmp(&a.last_activity))
                .then_with(|| a_id.cmp(b_id))
        });
        let evicted: Vec<String> = ranked
            .into_iter()
            .skip(self.capacity.max(usize::from(keep.is_some())))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &evicted {
            sessions.remove(id);
        }

        info!(
            "Cleaned up {} old sessions, keeping {} most recent",
            evicted.len(),
            self.capacity
        );
        evicted.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn unused_id(sessions: &HashMap<String, Session>) -> String {
        loop {
            let id = new_session_id();
            if !sessions.contains_key(&id) {
                return id;
            }
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock that advances one second per reading.
    struct SteppingClock {
        base: DateTime<Utc>,
        ticks: AtomicI64,
    }

    impl SteppingClock {
        fn new() -> Self {
            Self {
                base: Utc::now(),
                ticks: AtomicI64::new(0),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            self.base + Duration::seconds(self.ticks.fetch_add(1, Ordering::SeqCst))
        }
    }

    /// Clock frozen at one instant.
    struct FrozenClock(DateTime<Utc>);

    impl Clock for FrozenClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn get_has_no_side_effect() {
        let store = SessionStore::default();
        assert!(store.get("missing").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn get_or_create_reuses_known_sessions() {
        let store = SessionStore::default();
        let created = store.get_or_create(None);
        let again = store.get_or_create(Some(&created.id));

        assert_eq!(created.id, again.id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_id_gets_a_fresh_generated_id() {
        let store = SessionStore::default();
        let session = store.get_or_create(Some("client-picked"));

        assert_ne!(session.id, "client-picked");
        assert!(session.id.starts_with("session_"));
        assert!(!store.contains("client-picked"));
    }

    #[test]
    fn record_exchange_appends_in_order() {
        let store = SessionStore::with_clock(10, Arc::new(SteppingClock::new()));
        let session = store.create();

        store.record_exchange(&session.id, Message::user("hi"), Message::assistant("hello"));

        let stored = store.get(&session.id);
        let contents: Vec<String> = stored
            .iter()
            .flat_map(|s| s.messages.iter().map(|m| m.content.clone()))
            .collect();
        assert_eq!(contents, vec!["hi", "hello"]);
        assert!(stored.is_some_and(|s| s.last_activity > s.created_at));
    }

    #[test]
    fn evicts_least_recently_active() {
        let store = SessionStore::with_clock(DEFAULT_CAPACITY, Arc::new(SteppingClock::new()));
        let ids: Vec<String> = (0..=DEFAULT_CAPACITY)
            .map(|_| {
                let session = store.create();
                store.record_exchange(&session.id, Message::user("q"), Message::assistant("a"));
                session.id
            })
            .collect();

        assert_eq!(store.len(), DEFAULT_CAPACITY);
        assert!(!store.contains(&ids[0]));
        assert!(ids[1..].iter().all(|id| store.contains(id)));
    }

    #[test]
    fn recent_activity_protects_old_sessions() {
        let store = SessionStore::with_clock(2, Arc::new(SteppingClock::new()));
        let first = store.create();
        let second = store.create();
        store.append(&first.id, Message::user("still here"));
        let third = store.create();

        assert_eq!(store.len(), 2);
        assert!(store.contains(&first.id));
        assert!(!store.contains(&second.id));
        assert!(store.contains(&third.id));
        assert_eq!(store.evict_if_over_capacity(), 0);
    }

    #[test]
    fn ties_are_broken_by_id() {
        let store = SessionStore::with_clock(2, Arc::new(FrozenClock(Utc::now())));
        store.create();
        store.create();
        store.append("session_zzz", Message::user("late"));
        store.append("session_000", Message::user("late"));
        assert_eq!(store.len(), 4);

        let mut expected = store.session_ids();
        expected.truncate(2);

        assert_eq!(store.evict_if_over_capacity(), 2);
        assert_eq!(store.session_ids(), expected);
        assert!(store.contains("session_000"));
    }

    #[test]
    fn creating_sessions_stays_within_capacity() {
        let store = SessionStore::with_clock(3, Arc::new(FrozenClock(Utc::now())));

        for _ in 0..10 {
            let session = store.create();
            assert!(store.len() <= 3);
            assert!(store.contains(&session.id));
        }
        for i in 0..10 {
            let session = store.get_or_create(Some(&format!("client-{i}")));
            assert!(store.len() <= 3);
            assert!(store.contains(&session.id));
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn append_recreates_evicted_session() {
        let store = SessionStore::default();
        store.append("session_gone", Message::user("late"));

        assert!(store.get("session_gone").is_some_and(|s| s.message_count() == 1));
    }
}
