use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::names;
use super::tracker::{Tracker, TrackerDeps};

#[derive(Clone)]
struct SessionEntry {
    tracker: Arc<Tracker>,
    created_seq: u64,
}

/// Session registry: `session_id -> Tracker`, bounded by `max_sessions`
/// (oldest session evicted first).
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
    seq: AtomicU64,
    max_sessions: usize,
    deps: TrackerDeps,
}

impl SessionRegistry {
    pub fn new(deps: TrackerDeps, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            seq: AtomicU64::new(1),
            max_sessions: max_sessions.max(1),
            deps,
        }
    }

    /// Resolve a known session, or start a new one. An unknown id is not
    /// adopted; the caller gets the freshly generated one back.
    pub fn get_or_init(&self, session_id: Option<&str>, user_id: Option<&str>) -> Arc<Tracker> {
        if let Some(tracker) = session_id.and_then(|sid| self.get(sid)) {
            if let Some(user) = user_id {
                tracker.bind_user(user);
            }
            return tracker;
        }

        let tracker = Arc::new(Tracker::new(self.deps.clone()));
        let sid = tracker.init_session(user_id);
        self.insert(sid, Arc::clone(&tracker));
        tracker
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<Tracker>> {
        self.sessions.get(session_id).map(|r| Arc::clone(&r.value().tracker))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn insert(&self, session_id: String, tracker: Arc<Tracker>) {
        while self.sessions.len() >= self.max_sessions {
            match self.evict_oldest() {
                Some(victim) => tracing::debug!(session = %victim, "evicted oldest session"),
                None => break,
            }
        }
        let created_seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(session_id, SessionEntry { tracker, created_seq });
        self.publish_size();
    }

    /// Evict the oldest session. Returns the victim's id.
    fn evict_oldest(&self) -> Option<String> {
        let victim = self
            .sessions
            .iter()
            .min_by_key(|e| e.value().created_seq)
            .map(|e| e.key().clone())?;
        self.sessions.remove(&victim)?;
        Some(victim)
    }

    fn publish_size(&self) {
        if let Err(e) = self.deps.registry.gauge(
            names::TRACKED_SESSIONS,
            names::TRACKED_SESSIONS_HELP,
            self.sessions.len() as f64,
            &[],
        ) {
            tracing::warn!(error = %e, "failed to publish session gauge");
        }
    }
}
