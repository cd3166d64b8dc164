//! Tracking state machine: Stopped <-> Active

use std::sync::Arc;

use tracing::{info, warn};

use super::TrackingError;
use crate::source::{PermissionCheck, SourceError};
use crate::types::TrackingState;

/// Outcome of a start/stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    AlreadyActive,
    Stopped,
    AlreadyStopped,
}

/// On/off switch for the pipeline.
///
/// There is no paused state; cadence changes while active are handled by the
/// interval controller and leave the state untouched.
pub struct TrackingStateMachine {
    state: TrackingState,
    permission: Arc<dyn PermissionCheck>,
}

impl TrackingStateMachine {
    pub fn new(permission: Arc<dyn PermissionCheck>) -> Self {
        Self {
            state: TrackingState::Stopped,
            permission,
        }
    }

    /// Move to `Active`.
    ///
    /// `subscribe` runs only when the transition is allowed; if it fails the
    /// state stays `Stopped`.
    pub fn start<F>(&mut self, subscribe: F) -> Result<Transition, TrackingError>
    where
        F: FnOnce() -> Result<(), SourceError>,
    {
        if self.state.is_active() {
            return Ok(Transition::AlreadyActive);
        }

        if !self.permission.is_granted() {
            warn!("Cannot start tracking: location permission not granted");
            return Err(TrackingError::PermissionDenied);
        }

        subscribe()?;
        self.state = TrackingState::Active;
        info!("Location tracking started");
        Ok(Transition::Started)
    }

    /// Move to `Stopped`, running `unsubscribe` if the state changed.
    pub fn stop<F>(&mut self, unsubscribe: F) -> Transition
    where
        F: FnOnce(),
    {
        if !self.state.is_active() {
            return Transition::AlreadyStopped;
        }

        unsubscribe();
        self.state = TrackingState::Stopped;
        info!("Location tracking stopped");
        Transition::Stopped
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn has_permission(&self) -> bool {
        self.permission.is_granted()
    }
}
