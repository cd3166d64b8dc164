//! Interval controller: sampling cadence and the fix subscription that follows it

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::TrackingError;
use crate::config::ConfigError;
use crate::source::{FixEvent, FixQuery, FixSink, FixSource, SourceError, SubscriptionRequest};
use crate::types::TrackingConfig;

/// Sole writer of the [`TrackingConfig`].
///
/// The config lives behind an `ArcSwap` shared with the sample gate, so a
/// reconfiguration is one pointer swap and readers never see a half-updated
/// interval. The controller also owns the fix subscription: each (re)subscribe
/// bumps the generation so late fixes from a torn-down subscription can be
/// told apart.
pub struct IntervalController {
    config: Arc<ArcSwap<TrackingConfig>>,
    source: Box<dyn FixSource>,
    fix_tx: mpsc::UnboundedSender<FixEvent>,
    generation: u64,
    subscribed: bool,
}

impl IntervalController {
    pub fn new(
        initial: TrackingConfig,
        source: Box<dyn FixSource>,
        fix_tx: mpsc::UnboundedSender<FixEvent>,
    ) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(initial)),
            source,
            fix_tx,
            generation: 0,
            subscribed: false,
        }
    }

    /// Read side of the config, for the sample gate
    pub fn shared_config(&self) -> Arc<ArcSwap<TrackingConfig>> {
        Arc::clone(&self.config)
    }

    pub fn current(&self) -> TrackingConfig {
        **self.config.load()
    }

    /// Whether a fix event came from the live subscription
    pub fn is_current(&self, generation: u64) -> bool {
        self.subscribed && generation == self.generation
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Subscribe at the current cadence.
    pub fn subscribe(&mut self) -> Result<(), SourceError> {
        if self.subscribed {
            return Ok(());
        }
        let config = self.current();
        let next_generation = self.generation + 1;
        let sink = FixSink::new(next_generation, self.fix_tx.clone());

        self.source.subscribe(SubscriptionRequest::from(&config), sink)?;

        self.generation = next_generation;
        self.subscribed = true;
        info!(
            source = self.source.source_name(),
            interval_ms = config.interval_millis(),
            fastest_ms = config.fastest_interval_millis(),
            max_delay_ms = config.bounded_delay_millis(),
            generation = self.generation,
            "Fix subscription started"
        );
        Ok(())
    }

    pub fn unsubscribe(&mut self) {
        if !self.subscribed {
            return;
        }
        self.source.unsubscribe();
        self.subscribed = false;
        info!(generation = self.generation, "Fix subscription stopped");
    }

    /// Change the sampling interval.
    ///
    /// While subscribed, the subscription is restarted at the new cadence
    /// before this returns. If the provider refuses the new subscription the
    /// previous config and subscription are restored and the error returned.
    pub fn reconfigure(&mut self, interval_millis: i64) -> Result<TrackingConfig, TrackingError> {
        if interval_millis <= 0 {
            return Err(TrackingError::Config(ConfigError::InvalidInterval(interval_millis)));
        }

        let updated = TrackingConfig::with_interval(interval_millis);
        let previous = self.current();
        self.config.store(Arc::new(updated));

        if self.subscribed {
            self.unsubscribe();
            if let Err(e) = self.subscribe() {
                warn!(error = %e, interval_ms = interval_millis, "Resubscribe failed, restoring previous interval");
                self.config.store(Arc::new(previous));
                if let Err(restore_err) = self.subscribe() {
                    error!(error = %restore_err, "Could not restore previous fix subscription");
                }
                return Err(TrackingError::Source(e));
            }
        }

        info!(
            interval_ms = updated.interval_millis(),
            fastest_ms = updated.fastest_interval_millis(),
            "Tracking interval set"
        );
        Ok(updated)
    }

    /// Shareable last-known-fix query of the owned provider
    pub fn fix_query(&self) -> Arc<dyn FixQuery> {
        self.source.fix_query()
    }
}
