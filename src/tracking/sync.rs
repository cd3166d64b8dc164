//! Sync manager: single-flight delivery protocol over the sample buffer
//!
//! ## States
//!
//! - **Idle**: nothing in flight; the next trigger with a non-empty buffer
//!   drains it into a [`SyncAttempt`] and moves to `Sending`.
//! - **Sending**: exactly one attempt is in flight. Triggers are ignored;
//!   samples keep accumulating in the buffer.
//! - **RetryScheduled**: the last attempt failed and its batch was requeued.
//!   Triggers are ignored until the retry timer fires.
//!
//! The manager does no I/O and owns no timer. It hands attempts to the caller,
//! receives them back with their outcome, and answers with a [`SyncAction`]
//! telling the caller what to schedule next.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::buffer::SampleBuffer;
use crate::transport::TransportError;
use crate::types::LocationSample;

/// Delivery protocol phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, serde::Serialize)]
pub enum SyncPhase {
    #[default]
    Idle,
    Sending,
    RetryScheduled,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncPhase::Idle => write!(f, "Idle"),
            SyncPhase::Sending => write!(f, "Sending"),
            SyncPhase::RetryScheduled => write!(f, "Retry Scheduled"),
        }
    }
}

/// One delivery attempt. Lives only while the batch is away from the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncAttempt {
    pub batch: Vec<LocationSample>,
    pub started_at_millis: i64,
}

/// What the owner of the manager should do after an attempt completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Nothing pending
    None,
    /// Samples arrived (or a flush was requested) during the attempt: trigger again now
    SendNow,
    /// Arm the retry timer for this delay
    RetryAfter(Duration),
}

/// Owns the sample buffer and the delivery state machine
#[derive(Debug)]
pub struct SyncManager {
    buffer: SampleBuffer,
    phase: SyncPhase,
    retry_delay: Duration,
    /// Forced flush requested while an attempt was already in flight
    flush_pending: bool,
}

impl SyncManager {
    pub fn new(retry_delay: Duration) -> Self {
        Self {
            buffer: SampleBuffer::new(),
            phase: SyncPhase::Idle,
            retry_delay,
            flush_pending: false,
        }
    }

    pub fn enqueue(&mut self, sample: LocationSample) {
        self.buffer.append(sample);
    }

    /// Regular trigger, issued after every accepted sample.
    ///
    /// Starts an attempt only from `Idle` with a non-empty buffer.
    pub fn trigger(&mut self, now_millis: i64) -> Option<SyncAttempt> {
        match self.phase {
            SyncPhase::Idle => self.begin(now_millis),
            SyncPhase::Sending | SyncPhase::RetryScheduled => None,
        }
    }

    /// Forced flush (stop / explicit sync).
    ///
    /// Sends immediately from `Idle` or `RetryScheduled` (cancelling the wait).
    /// If an attempt is already in flight, the flush is deferred to its
    /// completion so the single-flight rule holds.
    pub fn force(&mut self, now_millis: i64) -> Option<SyncAttempt> {
        match self.phase {
            SyncPhase::Idle | SyncPhase::RetryScheduled => {
                let attempt = self.begin(now_millis);
                if attempt.is_none() {
                    self.phase = SyncPhase::Idle;
                }
                attempt
            }
            SyncPhase::Sending => {
                debug!("Flush requested during in-flight attempt; deferring");
                self.flush_pending = true;
                None
            }
        }
    }

    /// Retry timer fired.
    pub fn retry_due(&mut self, now_millis: i64) -> Option<SyncAttempt> {
        if self.phase != SyncPhase::RetryScheduled {
            return None;
        }
        info!(buffered = self.buffer.len(), "Retrying location send");
        let attempt = self.begin(now_millis);
        if attempt.is_none() {
            self.phase = SyncPhase::Idle;
        }
        attempt
    }

    /// An attempt finished. On failure its batch is requeued at the front.
    pub fn complete(&mut self, attempt: SyncAttempt, result: Result<(), TransportError>) -> SyncAction {
        let flush = std::mem::take(&mut self.flush_pending);

        match result {
            Ok(()) => {
                info!(count = attempt.batch.len(), "Successfully sent locations to server");
                self.phase = SyncPhase::Idle;
                if self.buffer.is_empty() {
                    SyncAction::None
                } else {
                    SyncAction::SendNow
                }
            }
            Err(e) => {
                warn!(
                    count = attempt.batch.len(),
                    error = %e,
                    retry_in_ms = self.retry_delay.as_millis() as u64,
                    "Failed to send locations"
                );
                self.buffer.requeue_front(attempt.batch);
                self.phase = SyncPhase::RetryScheduled;
                if flush {
                    SyncAction::SendNow
                } else {
                    SyncAction::RetryAfter(self.retry_delay)
                }
            }
        }
    }

    fn begin(&mut self, now_millis: i64) -> Option<SyncAttempt> {
        if self.buffer.is_empty() {
            return None;
        }
        let batch = self.buffer.drain_all();
        debug!(count = batch.len(), "Attempting to send locations to server");
        self.phase = SyncPhase::Sending;
        Some(SyncAttempt {
            batch,
            started_at_millis: now_millis,
        })
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RETRY: Duration = Duration::from_millis(30_000);

    fn sample(ts: i64) -> LocationSample {
        LocationSample {
            subject_id: "u1".to_string(),
            latitude: 52.37,
            longitude: 4.89,
            captured_at_millis: ts,
            accuracy_meters: 15.0,
            device_info: "test".to_string(),
        }
    }

    fn ts(samples: &[LocationSample]) -> Vec<i64> {
        samples.iter().map(|s| s.captured_at_millis).collect()
    }

    fn network_down() -> Result<(), TransportError> {
        Err(TransportError::Transport("connection refused".to_string()))
    }

    #[test]
    fn test_trigger_on_empty_buffer_stays_idle() {
        let mut sync = SyncManager::new(RETRY);
        assert!(sync.trigger(0).is_none());
        assert_eq!(sync.phase(), SyncPhase::Idle);
    }

    #[test]
    fn test_single_sample_success() {
        let mut sync = SyncManager::new(RETRY);
        sync.enqueue(sample(1));

        let attempt = sync.trigger(10).unwrap();
        assert_eq!(attempt.started_at_millis, 10);
        assert_eq!(sync.phase(), SyncPhase::Sending);
        assert_eq!(sync.buffered(), 0);

        assert_eq!(sync.complete(attempt, Ok(())), SyncAction::None);
        assert_eq!(sync.phase(), SyncPhase::Idle);
        assert_eq!(sync.buffered(), 0);
    }

    #[test]
    fn test_no_overlapping_attempts() {
        let mut sync = SyncManager::new(RETRY);
        sync.enqueue(sample(1));
        let first = sync.trigger(0).unwrap();

        sync.enqueue(sample(2));
        assert!(sync.trigger(1).is_none());
        assert_eq!(sync.buffered(), 1);

        // Success with new samples waiting asks for an immediate re-trigger
        assert_eq!(sync.complete(first, Ok(())), SyncAction::SendNow);
        let second = sync.trigger(2).unwrap();
        assert_eq!(ts(&second.batch), vec![2]);
    }

    #[test]
    fn test_failure_requeues_and_schedules_retry() {
        let mut sync = SyncManager::new(RETRY);
        sync.enqueue(sample(1));
        let attempt = sync.trigger(0).unwrap();

        assert_eq!(sync.complete(attempt, network_down()), SyncAction::RetryAfter(RETRY));
        assert_eq!(sync.phase(), SyncPhase::RetryScheduled);
        assert_eq!(sync.buffered(), 1);

        // Regular triggers wait for the timer
        sync.enqueue(sample(2));
        assert!(sync.trigger(5).is_none());
    }

    #[test]
    fn test_requeued_batch_precedes_later_samples() {
        let mut sync = SyncManager::new(RETRY);
        sync.enqueue(sample(1));
        sync.enqueue(sample(2));
        let attempt = sync.trigger(0).unwrap();

        // Arrives while the attempt is in flight
        sync.enqueue(sample(3));
        sync.complete(attempt, network_down());
        sync.enqueue(sample(4));

        let retry = sync.retry_due(30_000).unwrap();
        assert_eq!(ts(&retry.batch), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_repeated_failures_then_success_delivers_batch_once() {
        let mut sync = SyncManager::new(RETRY);
        sync.enqueue(sample(1));
        sync.enqueue(sample(2));

        let mut delivered: Vec<LocationSample> = Vec::new();
        let mut attempt = sync.trigger(0).unwrap();
        for n in 1..=5 {
            sync.complete(attempt, network_down());
            attempt = sync.retry_due(n * 30_000).unwrap();
        }
        delivered.extend(attempt.batch.iter().cloned());
        assert_eq!(sync.complete(attempt, Ok(())), SyncAction::None);

        assert_eq!(ts(&delivered), vec![1, 2]);
        assert_eq!(sync.buffered(), 0);
    }

    #[test]
    fn test_application_failure_retried_like_transport_failure() {
        let mut sync = SyncManager::new(RETRY);
        sync.enqueue(sample(1));
        let attempt = sync.trigger(0).unwrap();

        let rejected = Err(TransportError::Application {
            status: 200,
            message: "Invalid API key".to_string(),
        });
        assert_eq!(sync.complete(attempt, rejected), SyncAction::RetryAfter(RETRY));
        assert_eq!(sync.buffered(), 1);
    }

    #[test]
    fn test_force_cancels_retry_wait() {
        let mut sync = SyncManager::new(RETRY);
        sync.enqueue(sample(1));
        let attempt = sync.trigger(0).unwrap();
        sync.complete(attempt, network_down());
        sync.enqueue(sample(2));

        let flush = sync.force(100).unwrap();
        assert_eq!(ts(&flush.batch), vec![1, 2]);
        assert_eq!(sync.phase(), SyncPhase::Sending);

        // The cancelled timer is now stale
        assert!(sync.retry_due(30_000).is_none());
    }

    #[test]
    fn test_force_on_empty_buffer_returns_to_idle() {
        let mut sync = SyncManager::new(RETRY);
        assert!(sync.force(0).is_none());
        assert_eq!(sync.phase(), SyncPhase::Idle);
    }

    #[test]
    fn test_force_during_flight_is_deferred() {
        let mut sync = SyncManager::new(RETRY);
        sync.enqueue(sample(1));
        let attempt = sync.trigger(0).unwrap();
        sync.enqueue(sample(2));

        assert!(sync.force(1).is_none());

        // Deferred flush skips the retry delay once
        assert_eq!(sync.complete(attempt, network_down()), SyncAction::SendNow);
        let flush = sync.force(2).unwrap();
        assert_eq!(ts(&flush.batch), vec![1, 2]);

        // Later failures fall back to the fixed delay
        assert_eq!(sync.complete(flush, network_down()), SyncAction::RetryAfter(RETRY));
    }
}
