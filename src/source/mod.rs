//! Fix source abstraction.
//!
//! The platform location service is an external collaborator. The tracking
//! core only needs to:
//!
//! - subscribe at a cadence and receive fixes through a [`FixSink`]
//! - unsubscribe
//! - ask once for the last known fix ([`FixQuery`], usable off the session task)
//!
//! and to check whether position access is granted ([`PermissionCheck`]).
//!
//! Every subscription gets a generation number baked into its sink. Fixes that
//! a torn-down subscription delivers late carry a stale generation and are
//! discarded by the session.

mod channel;
mod stdin;

pub use channel::{ChannelFixSource, FixFeeder};
pub use stdin::feed_json_lines;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::{RawFix, TrackingConfig};

/// Source errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("fix subscription failed: {0}")]
    SubscriptionFailed(String),
    #[error("fix source unavailable: {0}")]
    Unavailable(String),
}

/// Cadence hints handed to the provider on subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub interval_millis: i64,
    pub fastest_interval_millis: i64,
    /// Maximum time the provider may batch fixes before delivering them
    pub max_delay_millis: i64,
}

impl From<&TrackingConfig> for SubscriptionRequest {
    fn from(config: &TrackingConfig) -> Self {
        Self {
            interval_millis: config.interval_millis(),
            fastest_interval_millis: config.fastest_interval_millis(),
            max_delay_millis: config.bounded_delay_millis(),
        }
    }
}

/// A fix tagged with the subscription generation that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixEvent {
    pub generation: u64,
    pub fix: RawFix,
}

/// Delivery end of one subscription
#[derive(Debug, Clone)]
pub struct FixSink {
    generation: u64,
    tx: mpsc::UnboundedSender<FixEvent>,
}

impl FixSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<FixEvent>) -> Self {
        Self { generation, tx }
    }

    /// Hand a fix to the session. Returns false once the session is gone.
    pub fn deliver(&self, fix: RawFix) -> bool {
        self.tx
            .send(FixEvent {
                generation: self.generation,
                fix,
            })
            .is_ok()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Trait abstracting the platform location provider.
pub trait FixSource: Send + 'static {
    /// Start delivering fixes at the requested cadence into `sink`.
    ///
    /// Called at most once between two `unsubscribe` calls.
    fn subscribe(&mut self, request: SubscriptionRequest, sink: FixSink) -> Result<(), SourceError>;

    /// Stop delivering fixes. Idempotent.
    fn unsubscribe(&mut self);

    /// Shareable last-known-fix query. May be called from any task.
    fn fix_query(&self) -> Arc<dyn FixQuery>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

/// One-shot query of the provider's last known fix.
///
/// Kept apart from [`FixSource`] so a slow provider answer never holds up the
/// session that owns the subscription.
#[async_trait]
pub trait FixQuery: Send + Sync + 'static {
    /// Last known fix. Does not touch the subscription.
    async fn current_fix(&self) -> Result<Option<RawFix>, SourceError>;
}

/// "Is this process allowed to read position?"
pub trait PermissionCheck: Send + Sync + 'static {
    fn is_granted(&self) -> bool;
}

impl<F> PermissionCheck for F
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    fn is_granted(&self) -> bool {
        self()
    }
}

/// Permission check for environments without a permission model
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl PermissionCheck for AlwaysGranted {
    fn is_granted(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_config() {
        let request = SubscriptionRequest::from(&TrackingConfig::with_interval(120_000));
        assert_eq!(request.interval_millis, 120_000);
        assert_eq!(request.fastest_interval_millis, 60_000);
        assert_eq!(request.max_delay_millis, 180_000);
    }

    #[test]
    fn test_sink_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = FixSink::new(7, tx);
        assert!(sink.deliver(RawFix::new(1.0, 2.0, 3.0, 4)));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.generation, 7);
        assert_eq!(event.fix.captured_at_millis, 4);

        drop(rx);
        assert!(!sink.deliver(RawFix::new(1.0, 2.0, 3.0, 5)));
    }

    #[test]
    fn test_closure_permission() {
        let denied = || false;
        assert!(!denied.is_granted());
        assert!(AlwaysGranted.is_granted());
    }
}
