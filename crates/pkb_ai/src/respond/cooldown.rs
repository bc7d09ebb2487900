use std::collections::HashMap;
use std::sync::Mutex;

use time::{Duration, OffsetDateTime};

pub const DEFAULT_INTRO_COOLDOWN: Duration = Duration::hours(12);

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Last time each requester was seen, keyed by requester identity.
pub trait LastSeenStore: Send + Sync {
    fn get(&self, requester_id: &str) -> Option<OffsetDateTime>;
    fn set(&self, requester_id: &str, ts: OffsetDateTime);
}

#[derive(Debug, Default)]
pub struct InMemoryLastSeenStore {
    inner: Mutex<HashMap<String, OffsetDateTime>>,
}

impl InMemoryLastSeenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LastSeenStore for InMemoryLastSeenStore {
    fn get(&self, requester_id: &str) -> Option<OffsetDateTime> {
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.get(requester_id).copied()
    }

    fn set(&self, requester_id: &str, ts: OffsetDateTime) {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(requester_id.to_string(), ts);
    }
}

/// Decide whether to greet `requester_id`, then record this visit.
///
/// The get and the set are separate lock acquisitions. Two concurrent first messages from the
/// same requester can both see "never seen" and both get the banner; that race is accepted.
pub fn check_and_touch(
    store: &dyn LastSeenStore,
    clock: &dyn Clock,
    requester_id: &str,
    cooldown: Duration,
) -> bool {
    let now = clock.now();
    let show = match store.get(requester_id) {
        None => true,
        Some(last) => now - last > cooldown,
    };
    store.set(requester_id, now);
    show
}
