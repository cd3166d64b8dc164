//! Position types: RawFix (provider output) and LocationSample (buffered record)

use serde::{Deserialize, Serialize};

// ============================================================================
// Raw Fix
// ============================================================================

/// A single raw position reading from the fix provider.
///
/// Also the line format accepted by the stdin fix source:
/// `{"latitude": 51.5, "longitude": -0.12, "accuracy_meters": 8.0, "captured_at_millis": 1700000000000}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius (m)
    pub accuracy_meters: f32,
    /// Provider capture time (unix millis)
    pub captured_at_millis: i64,
}

impl RawFix {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f32, captured_at_millis: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            captured_at_millis,
        }
    }
}

// ============================================================================
// Location Sample
// ============================================================================

/// A fix that passed the sample gate and is waiting for delivery.
///
/// Field names on the wire follow the analytics server's batch schema.
/// Samples have no identity of their own: two samples with identical fields
/// are equal, and ordering is the order in which they were accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    #[serde(rename = "user_id")]
    pub subject_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Acceptance time (unix millis)
    #[serde(rename = "timestamp")]
    pub captured_at_millis: i64,
    #[serde(rename = "accuracy")]
    pub accuracy_meters: f32,
    pub device_info: String,
}

impl LocationSample {
    /// Build a sample from an accepted fix.
    ///
    /// The timestamp is the acceptance time, not the provider's capture time,
    /// so that server-side activity histograms line up with the gate cadence.
    pub fn from_fix(fix: &RawFix, subject_id: &str, device_info: &str, accepted_at_millis: i64) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            captured_at_millis: accepted_at_millis,
            accuracy_meters: fix.accuracy_meters,
            device_info: device_info.to_string(),
        }
    }
}

impl std::fmt::Display for LocationSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} @ ({:.6}, {:.6}) ±{:.0}m t={}",
            self.subject_id, self.latitude, self.longitude, self.accuracy_meters, self.captured_at_millis
        )
    }
}
