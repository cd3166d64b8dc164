//! Channel fix source: a provider fed programmatically.
//!
//! [`ChannelFixSource`] is handed to the session; the paired [`FixFeeder`]
//! stays with whoever produces fixes (stdin replay, a platform bridge, tests).
//! Fixes pushed while no subscription is active only update the last known
//! fix.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::{FixQuery, FixSink, FixSource, SourceError, SubscriptionRequest};
use crate::types::RawFix;

#[derive(Debug, Default)]
struct Shared {
    sink: Option<FixSink>,
    request: Option<SubscriptionRequest>,
    last_fix: Option<RawFix>,
    /// Number of live subscriptions; more than one means a double subscribe
    active: usize,
    total_subscribes: usize,
    fail_subscribe: bool,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Provider side handed to a tracking session
#[derive(Debug)]
pub struct ChannelFixSource {
    shared: Arc<Mutex<Shared>>,
}

/// Producer side: pushes fixes and observes the subscription
#[derive(Debug, Clone)]
pub struct FixFeeder {
    shared: Arc<Mutex<Shared>>,
}

impl ChannelFixSource {
    pub fn new() -> (Self, FixFeeder) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            FixFeeder { shared },
        )
    }
}

/// Last-known-fix reader over the shared channel state
#[derive(Debug)]
struct ChannelFixQuery {
    shared: Arc<Mutex<Shared>>,
}

#[async_trait]
impl FixQuery for ChannelFixQuery {
    async fn current_fix(&self) -> Result<Option<RawFix>, SourceError> {
        Ok(lock(&self.shared).last_fix)
    }
}

impl FixSource for ChannelFixSource {
    fn subscribe(&mut self, request: SubscriptionRequest, sink: FixSink) -> Result<(), SourceError> {
        let mut shared = lock(&self.shared);
        if shared.fail_subscribe {
            return Err(SourceError::SubscriptionFailed("provider refused subscription".to_string()));
        }
        debug!(
            generation = sink.generation(),
            interval_ms = request.interval_millis,
            "Channel source subscribed"
        );
        shared.sink = Some(sink);
        shared.request = Some(request);
        shared.active += 1;
        shared.total_subscribes += 1;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        let mut shared = lock(&self.shared);
        if shared.sink.take().is_some() {
            shared.active = shared.active.saturating_sub(1);
            shared.request = None;
            debug!("Channel source unsubscribed");
        }
    }

    fn fix_query(&self) -> Arc<dyn FixQuery> {
        Arc::new(ChannelFixQuery {
            shared: Arc::clone(&self.shared),
        })
    }

    fn source_name(&self) -> &str {
        "channel"
    }
}

impl FixFeeder {
    /// Push a fix. Returns true if an active subscription received it.
    pub fn push(&self, fix: RawFix) -> bool {
        let mut shared = lock(&self.shared);
        shared.last_fix = Some(fix);
        shared.sink.as_ref().is_some_and(|sink| sink.deliver(fix))
    }

    /// Cadence of the live subscription, if any
    pub fn active_request(&self) -> Option<SubscriptionRequest> {
        lock(&self.shared).request
    }

    pub fn active_subscriptions(&self) -> usize {
        lock(&self.shared).active
    }

    /// Subscribe calls accepted since creation
    pub fn total_subscribes(&self) -> usize {
        lock(&self.shared).total_subscribes
    }

    /// Make subsequent subscribe calls fail (provider outage)
    pub fn fail_subscriptions(&self, fail: bool) {
        lock(&self.shared).fail_subscribe = fail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn request(interval: i64) -> SubscriptionRequest {
        SubscriptionRequest {
            interval_millis: interval,
            fastest_interval_millis: interval / 2,
            max_delay_millis: interval + 60_000,
        }
    }

    #[tokio::test]
    async fn test_push_reaches_subscriber() {
        let (mut source, feeder) = ChannelFixSource::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(!feeder.push(RawFix::new(1.0, 1.0, 5.0, 1)));
        source.subscribe(request(1_000), FixSink::new(1, tx)).unwrap();
        assert!(feeder.push(RawFix::new(2.0, 2.0, 5.0, 2)));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.generation, 1);
        assert_eq!(event.fix.latitude, 2.0);
        let last = source.fix_query().current_fix().await.unwrap();
        assert_eq!(last.unwrap().captured_at_millis, 2);
    }

    #[test]
    fn test_subscription_bookkeeping() {
        let (mut source, feeder) = ChannelFixSource::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        source.subscribe(request(1_000), FixSink::new(1, tx)).unwrap();
        assert_eq!(feeder.active_subscriptions(), 1);
        assert_eq!(feeder.active_request().unwrap().interval_millis, 1_000);

        source.unsubscribe();
        source.unsubscribe();
        assert_eq!(feeder.active_subscriptions(), 0);
        assert!(feeder.active_request().is_none());
        assert_eq!(feeder.total_subscribes(), 1);
    }

    #[test]
    fn test_injected_subscribe_failure() {
        let (mut source, feeder) = ChannelFixSource::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        feeder.fail_subscriptions(true);

        assert!(source.subscribe(request(1_000), FixSink::new(1, tx)).is_err());
        assert_eq!(feeder.active_subscriptions(), 0);
    }
}
