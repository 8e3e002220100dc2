//! Care-unit wall clock abstraction.
//!
//! Scheduling never reads the platform clock directly: the ledger is handed
//! a `Clock` at construction and threads the resulting instant through the
//! pure computation, so every due-time decision is reproducible in tests.

use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDateTime};

/// Source of "now" in the care unit's local wall time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Production clock: the deployment host's local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Pinned clock for deterministic tests. Public because host applications
/// need it to test their own administration flows.
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(instant: NaiveDateTime) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    /// Replace the pinned instant.
    pub fn set(&self, instant: NaiveDateTime) {
        if let Ok(mut guard) = self.instant.lock() {
            *guard = instant;
        }
    }

    /// Move the pinned instant forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.instant.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.instant
            .lock()
            .map(|guard| *guard)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}
