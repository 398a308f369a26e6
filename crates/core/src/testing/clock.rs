//! Mock clock for deterministic testing

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::clock::Clock;

/// Clock whose time only moves when advanced or slept on.
///
/// `sleep` returns immediately after advancing the clock and records the
/// requested duration.
#[derive(Debug, Clone)]
pub struct MockClock {
    base: DateTime<Utc>,
    elapsed: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl MockClock {
    /// Clock starting at a fixed instant.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Clock starting at `base`.
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Simulate time passing without waiting.
    pub fn advance(&self, duration: Duration) {
        // Test utility: panic on poisoned mutex to fail tests early
        let mut elapsed = self.elapsed.lock().expect("mutex poisoned");
        *elapsed += duration;
    }

    /// Total time advanced or slept.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().expect("mutex poisoned")
    }

    /// Durations passed to `sleep`, in call order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("mutex poisoned").clone()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.elapsed()).unwrap_or_default();
        self.base + elapsed
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().expect("mutex poisoned").push(duration);
        self.advance(duration);
    }
}
