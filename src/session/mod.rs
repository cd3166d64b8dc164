//! Tracking session - one subject, one actor
//!
//! A session is an explicit, owned object: build as many as you like, each
//! with its own config, transport and fix source. Nothing is process-global.
//!
//! ```ignore
//! let (source, feeder) = ChannelFixSource::new();
//! let handle = session::spawn(&config, transport, Box::new(source), Arc::new(AlwaysGranted));
//! handle.set_subject_id("user-42");
//! handle.start().await?;
//! ```

mod actor;
mod handle;

pub use actor::SessionActor;
pub use handle::SessionHandle;

use std::sync::Arc;

use serde::Serialize;

use crate::config::SessionConfig;
use crate::source::{FixSource, PermissionCheck};
use crate::time::{Clock, SystemClock};
use crate::tracking::SyncPhase;
use crate::transport::Transport;
use crate::types::{TrackingConfig, TrackingState};

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: TrackingState,
    pub phase: SyncPhase,
    /// Samples waiting in the buffer (excludes an in-flight batch)
    pub buffered: usize,
    pub config: TrackingConfig,
    pub subject_id: Option<String>,
    pub last_accepted_at: Option<i64>,
    pub retry_pending: bool,
}

/// Spawn a session on the current tokio runtime using the system clock.
pub fn spawn(
    config: &SessionConfig,
    transport: Arc<dyn Transport>,
    source: Box<dyn FixSource>,
    permission: Arc<dyn PermissionCheck>,
) -> SessionHandle {
    spawn_with_clock(config, transport, source, permission, Arc::new(SystemClock))
}

/// Spawn a session with an explicit clock.
pub fn spawn_with_clock(
    config: &SessionConfig,
    transport: Arc<dyn Transport>,
    source: Box<dyn FixSource>,
    permission: Arc<dyn PermissionCheck>,
    clock: Arc<dyn Clock>,
) -> SessionHandle {
    let (actor, handle) = SessionActor::new(config, transport, source, permission, clock);
    tokio::spawn(actor.run());
    handle
}
