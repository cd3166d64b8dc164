//! Core state types: TrackingState, TrackingConfig

use serde::{Deserialize, Serialize};

use crate::config::defaults::BOUNDED_DELAY_SLACK_MS;

// ============================================================================
// Tracking State
// ============================================================================

/// On/off state of the whole tracking pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum TrackingState {
    #[default]
    Stopped,
    Active,
}

impl TrackingState {
    pub fn is_active(self) -> bool {
        matches!(self, TrackingState::Active)
    }
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingState::Stopped => write!(f, "Stopped"),
            TrackingState::Active => write!(f, "Active"),
        }
    }
}

// ============================================================================
// Tracking Config
// ============================================================================

/// Sampling cadence.
///
/// `fastest_interval_millis` is always half of `interval_millis`; the only way
/// to build one is [`TrackingConfig::with_interval`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct TrackingConfig {
    interval_millis: i64,
    fastest_interval_millis: i64,
}

impl TrackingConfig {
    pub fn with_interval(interval_millis: i64) -> Self {
        Self {
            interval_millis,
            fastest_interval_millis: interval_millis / 2,
        }
    }

    pub fn interval_millis(&self) -> i64 {
        self.interval_millis
    }

    pub fn fastest_interval_millis(&self) -> i64 {
        self.fastest_interval_millis
    }

    /// Maximum batching delay hint handed to the fix provider.
    pub fn bounded_delay_millis(&self) -> i64 {
        self.interval_millis.saturating_add(BOUNDED_DELAY_SLACK_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fastest_is_half_interval() {
        let config = TrackingConfig::with_interval(600_000);
        assert_eq!(config.fastest_interval_millis(), 300_000);
        assert_eq!(config.bounded_delay_millis(), 660_000);

        let odd = TrackingConfig::with_interval(1_001);
        assert_eq!(odd.fastest_interval_millis(), 500);
    }

    #[test]
    fn test_default_state_is_stopped() {
        assert_eq!(TrackingState::default(), TrackingState::Stopped);
        assert!(!TrackingState::Stopped.is_active());
        assert!(TrackingState::Active.is_active());
    }
}
