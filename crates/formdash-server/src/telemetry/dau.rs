//! Daily-active-user dedup state and the calendar clock it keys on.
//!
//! The tracker does a read-then-write against the store with no lock spanning
//! both steps; two writers racing on the same user/day can both count. That
//! window is accepted.

use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;

/// Calendar day source.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// UTC calendar day.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Per-user record of the last day a DAU increment was made.
pub trait DauStore: Send + Sync {
    fn last_seen(&self, user_id: &str) -> Option<NaiveDate>;
    fn mark(&self, user_id: &str, day: NaiveDate);
}

/// Holds entries for the newest day only; older days are pruned when the
/// first mark of a new day arrives.
#[derive(Default)]
pub struct MemoryDauStore {
    days: DashMap<String, NaiveDate>,
    current: Mutex<Option<NaiveDate>>,
}

impl MemoryDauStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// True when `day` is newer than any day marked so far.
    fn advance(&self, day: NaiveDate) -> bool {
        let Ok(mut current) = self.current.lock() else {
            return false;
        };
        if current.map_or(true, |c| day > c) {
            *current = Some(day);
            true
        } else {
            false
        }
    }
}

impl DauStore for MemoryDauStore {
    fn last_seen(&self, user_id: &str) -> Option<NaiveDate> {
        self.days.get(user_id).map(|d| *d.value())
    }

    fn mark(&self, user_id: &str, day: NaiveDate) {
        if self.advance(day) {
            let before = self.days.len();
            self.days.retain(|_, d| *d >= day);
            let pruned = before.saturating_sub(self.days.len());
            tracing::debug!(pruned, day = %day, "pruned stale dau entries");
        }
        self.days.insert(user_id.to_string(), day);
    }
}
