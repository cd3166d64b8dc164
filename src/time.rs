//! Wall-clock abstraction.
//!
//! The sample gate and delivery attempts are stamped with unix milliseconds.
//! Sessions read them through [`Clock`] so tests can drive time by hand.

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current wall-clock time in unix milliseconds.
pub trait Clock: Send + Sync + 'static {
    fn now_millis(&self) -> i64;
}

/// Real UTC clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock.
///
/// Shared between a test and the session it drives:
///
/// ```
/// use std::sync::Arc;
/// use location_analytics::time::{Clock, ManualClock};
///
/// let clock = Arc::new(ManualClock::new(0));
/// clock.advance(650_000);
/// assert_eq!(clock.now_millis(), 650_000);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock> Clock for std::sync::Arc<C> {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}
