//! Per-domain request spacing shared by all workers

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::trace;

/// Minimum spacing between two consecutive requests to one domain
pub const MIN_DOMAIN_INTERVAL: Duration = Duration::from_millis(500);

/// Tracks the earliest instant each domain may be requested again
pub struct PolitenessController {
    delay: Duration,
    floor: Duration,
    next_allowed: Mutex<HashMap<String, Instant>>,
}

impl PolitenessController {
    /// Creates a controller spacing requests by `delay` (and at least 500ms)
    pub fn new(delay: Duration) -> Self {
        Self::with_floor(delay, MIN_DOMAIN_INTERVAL)
    }

    pub fn with_floor(delay: Duration, floor: Duration) -> Self {
        Self {
            delay,
            floor,
            next_allowed: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.next_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until `domain` may be requested
    ///
    /// The remaining wait is computed under the lock and slept outside it,
    /// so one worker waiting never holds up another.
    ///
    /// Waiting does not reserve the slot. Two workers that wake for the same
    /// domain at once may both send before either calls
    /// [`record_request`](Self::record_request), so spacing is best-effort
    /// under contention. Each record still pushes the next slot out by at
    /// least the floor.
    pub fn wait_for_domain(&self, domain: &str) {
        if let Some(wait) = self.remaining(domain, Instant::now()) {
            trace!(domain, wait_ms = wait.as_millis() as u64, "Politeness wait");
            thread::sleep(wait);
        }
    }

    /// Time left before `domain` may be requested, measured from `now`
    pub fn remaining(&self, domain: &str, now: Instant) -> Option<Duration> {
        let next = *self.lock().get(domain)?;
        let wait = next.saturating_duration_since(now);
        (!wait.is_zero()).then_some(wait)
    }

    /// Records that a request to `domain` has just finished
    pub fn record_request(&self, domain: &str) {
        self.record_request_at(domain, Instant::now());
    }

    /// Records a request to `domain` finished at `now`
    ///
    /// The next allowed instant is `now + delay`, but never less than the
    /// previous allowed instant plus the floor.
    pub fn record_request_at(&self, domain: &str, now: Instant) {
        let mut next_allowed = self.lock();
        let mut next = now + self.delay;
        if let Some(prev) = next_allowed.get(domain) {
            next = next.max(*prev + self.floor);
        }
        next_allowed.insert(domain.to_string(), next);
    }

    /// The earliest instant `domain` may be requested, if it has been seen
    pub fn next_allowed(&self, domain: &str) -> Option<Instant> {
        self.lock().get(domain).copied()
    }
}
