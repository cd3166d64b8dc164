//! Sample gate: time-based debounce on incoming fixes

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::trace;

use crate::types::{RawFix, TrackingConfig};

/// Debounce filter deciding which fixes become samples.
///
/// A fix is accepted when no fix was accepted yet, or when at least the
/// *current* interval has elapsed since the last accepted one. The interval
/// is re-read on every check, so lowering it mid-session can make the very
/// next fix acceptable. Fix accuracy plays no part in the decision.
pub struct SampleGate {
    config: Arc<ArcSwap<TrackingConfig>>,
    last_accepted_at: Option<i64>,
}

impl SampleGate {
    pub fn new(config: Arc<ArcSwap<TrackingConfig>>) -> Self {
        Self {
            config,
            last_accepted_at: None,
        }
    }

    /// Returns true and records `now_millis` if the fix should be buffered.
    ///
    /// A rejected fix is a normal drop, not an error.
    pub fn accept(&mut self, fix: &RawFix, now_millis: i64) -> bool {
        let interval = self.config.load().interval_millis();

        let accepted = match self.last_accepted_at {
            None => true,
            Some(last) => now_millis.saturating_sub(last) >= interval,
        };

        if accepted {
            self.last_accepted_at = Some(now_millis);
        } else {
            trace!(
                now_millis,
                interval,
                accuracy = fix.accuracy_meters,
                "Skipping fix - not enough time elapsed"
            );
        }

        accepted
    }

    pub fn last_accepted_at(&self) -> Option<i64> {
        self.last_accepted_at
    }
}
