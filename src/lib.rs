//! Location Analytics: position sampling and reliable sync
//!
//! Accepts raw position fixes, keeps the ones that pass a time-based gate,
//! buffers them, and delivers them to an analytics server with at-least-once
//! semantics under network failure.
//!
//! ## Architecture
//!
//! - **Tracking core** (`tracking`): gate, buffer, single-flight sync manager,
//!   interval controller, Stopped/Active state machine
//! - **Session** (`session`): actor owning the core for one subject; the only
//!   place where fixes, delivery outcomes and retry timers meet
//! - **Transport** (`transport`): abstract send/fetch capability with an
//!   HTTP + JSON implementation
//! - **Statistics** (`statistics`): read-only access to server-computed stats

pub mod config;
pub mod types;
pub mod time;
pub mod source;
pub mod transport;
pub mod tracking;
pub mod statistics;
pub mod session;

// Re-export configuration
pub use config::{ConfigError, SessionConfig};

// Re-export commonly used types
pub use types::{
    LocationSample, LocationStop, RawFix, TrackingConfig, TrackingState, UserStatistics,
};

// Re-export session entry points
pub use session::{SessionActor, SessionHandle, SessionStatus};

// Re-export collaborator seams
pub use source::{AlwaysGranted, ChannelFixSource, FixFeeder, FixQuery, FixSource, PermissionCheck};
pub use statistics::{StatisticsClient, StatisticsError};
pub use tracking::{SyncPhase, TrackingError, Transition};
pub use transport::{HttpTransport, Transport, TransportError};
