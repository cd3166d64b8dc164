//! Tracking core: sampling gate, buffer and delivery protocol
//!
//! ## Architecture
//!
//! - **SampleGate**: time-based debounce deciding which fixes become samples
//! - **SampleBuffer**: FIFO of samples awaiting delivery (drain / requeue-front)
//! - **SyncManager**: single-flight delivery state machine with fixed-delay retry
//! - **IntervalController**: atomic cadence swaps + fix subscription restarts
//! - **TrackingStateMachine**: Stopped/Active, permission-gated start
//!
//! None of these types do I/O or spawn tasks. The session actor owns them and
//! is the single place where fixes, delivery outcomes and timers meet.

pub mod buffer;
pub mod gate;
pub mod interval;
pub mod state;
pub mod sync;

pub use buffer::SampleBuffer;
pub use gate::SampleGate;
pub use interval::IntervalController;
pub use state::{TrackingStateMachine, Transition};
pub use sync::{SyncAction, SyncAttempt, SyncManager, SyncPhase};

use crate::config::ConfigError;
use crate::source::SourceError;

/// Errors surfaced by tracking control operations.
///
/// Delivery failures never appear here: they are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("location permission not granted")]
    PermissionDenied,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("tracking session has shut down")]
    SessionClosed,
}
