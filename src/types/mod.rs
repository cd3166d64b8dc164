//! Shared data structures for position tracking and sync
//!
//! - RawFix: provider output, input to the sample gate
//! - LocationSample: accepted fix, buffered until delivery
//! - TrackingState / TrackingConfig: pipeline on/off and cadence
//! - UserStatistics: server-computed summary consumed read-only

mod state;
mod sample;
mod statistics;

pub use state::*;
pub use sample::*;
pub use statistics::*;
