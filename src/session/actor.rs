//! Session actor - owns the tracking core for one subject

use std::ops::ControlFlow;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::handle::SessionHandle;
use super::SessionStatus;
use crate::config::defaults::{FIX_BURST_LIMIT, SESSION_COMMAND_CAPACITY};
use crate::config::SessionConfig;
use crate::source::{FixEvent, FixQuery, FixSource, PermissionCheck};
use crate::statistics::StatisticsClient;
use crate::time::Clock;
use crate::tracking::{
    IntervalController, SampleGate, SyncAction, SyncAttempt, SyncManager, SyncPhase,
    TrackingError, TrackingStateMachine, Transition,
};
use crate::transport::{Transport, TransportError};
use crate::types::{LocationSample, RawFix, TrackingConfig};

// ============================================================================
// Commands
// ============================================================================

/// Commands for SessionActor
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Start {
        reply: oneshot::Sender<Result<Transition, TrackingError>>,
    },
    Stop {
        reply: oneshot::Sender<Transition>,
    },
    Reconfigure {
        interval_millis: i64,
        reply: oneshot::Sender<Result<TrackingConfig, TrackingError>>,
    },
    ForceSync {
        reply: oneshot::Sender<()>,
    },
    CurrentFix {
        reply: oneshot::Sender<Result<Option<RawFix>, TrackingError>>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    Shutdown,
}

/// A finished delivery attempt, reported back by its task
struct DeliveryOutcome {
    attempt: SyncAttempt,
    result: Result<(), TransportError>,
}

// ============================================================================
// Session Actor
// ============================================================================

/// Single serialization point for one tracking session.
///
/// Commands, fix arrivals, delivery completions and the retry timer are all
/// handled on this task, one at a time. Deliveries and last-known-fix queries
/// run in spawned tasks so the actor never waits on I/O.
///
/// Dropping every [`SessionHandle`] does not discard buffered samples: the
/// actor unsubscribes, flushes, and keeps retrying until the buffer is
/// delivered. Only [`SessionHandle::shutdown`] drops undelivered data.
pub struct SessionActor {
    rx: mpsc::Receiver<SessionCommand>,
    fix_rx: mpsc::UnboundedReceiver<FixEvent>,
    done_tx: mpsc::UnboundedSender<DeliveryOutcome>,
    done_rx: mpsc::UnboundedReceiver<DeliveryOutcome>,
    gate: SampleGate,
    sync: SyncManager,
    interval: IntervalController,
    fix_query: Arc<dyn FixQuery>,
    state: TrackingStateMachine,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    subject: Arc<ArcSwapOption<String>>,
    device_info: String,
    /// Armed while the sync manager is in `RetryScheduled`
    retry_at: Option<Instant>,
    /// Every handle is gone; run until the buffer is delivered
    handles_closed: bool,
}

impl SessionActor {
    /// Create new session actor and handle
    pub fn new(
        config: &SessionConfig,
        transport: Arc<dyn Transport>,
        source: Box<dyn FixSource>,
        permission: Arc<dyn PermissionCheck>,
        clock: Arc<dyn Clock>,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::channel(SESSION_COMMAND_CAPACITY);
        let (fix_tx, fix_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        let interval = IntervalController::new(config.tracking_config(), source, fix_tx);
        let gate = SampleGate::new(interval.shared_config());
        let fix_query = interval.fix_query();
        let subject = Arc::new(ArcSwapOption::from(
            config
                .subject_id
                .as_deref()
                .and_then(normalize_subject)
                .map(Arc::new),
        ));

        let actor = Self {
            rx,
            fix_rx,
            done_tx,
            done_rx,
            gate,
            sync: SyncManager::new(config.retry_delay()),
            interval,
            fix_query,
            state: TrackingStateMachine::new(Arc::clone(&permission)),
            transport: Arc::clone(&transport),
            clock,
            subject: Arc::clone(&subject),
            device_info: config.device_info.clone(),
            retry_at: None,
            handles_closed: false,
        };

        let handle = SessionHandle::new(tx, subject, permission, StatisticsClient::new(transport));

        (actor, handle)
    }

    /// Run the session loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        info!(
            interval_ms = self.interval.current().interval_millis(),
            "TrackingSession starting"
        );

        let mut fixes_in_row = 0usize;

        loop {
            if self.handles_closed && self.is_drained() {
                break;
            }

            if fixes_in_row >= FIX_BURST_LIMIT {
                fixes_in_row = 0;
                if self.service_pending().is_break() {
                    break;
                }
            }

            let retry_at = self.retry_at;

            // Fixes and outcomes already queued are handled before any later command
            tokio::select! {
                biased;

                Some(event) = self.fix_rx.recv() => {
                    fixes_in_row += 1;
                    self.handle_fix(event);
                }
                Some(outcome) = self.done_rx.recv() => {
                    fixes_in_row = 0;
                    self.handle_outcome(outcome);
                }
                cmd = self.rx.recv(), if !self.handles_closed => {
                    fixes_in_row = 0;
                    if self.on_command(cmd).is_break() {
                        break;
                    }
                }
                () = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    fixes_in_row = 0;
                    self.handle_retry_timer();
                }
            }
        }

        self.interval.unsubscribe();
        info!(
            buffered = self.sync.buffered(),
            phase = %self.sync.phase(),
            "TrackingSession stopped"
        );
    }

    /// Between fix bursts: let through whatever else is already waiting
    fn service_pending(&mut self) -> ControlFlow<()> {
        while let Ok(outcome) = self.done_rx.try_recv() {
            self.handle_outcome(outcome);
        }

        if !self.handles_closed {
            let flow = match self.rx.try_recv() {
                Ok(cmd) => self.on_command(Some(cmd)),
                Err(TryRecvError::Disconnected) => self.on_command(None),
                Err(TryRecvError::Empty) => ControlFlow::Continue(()),
            };
            if flow.is_break() {
                return flow;
            }
        }

        if self.retry_at.is_some_and(|at| at <= Instant::now()) {
            self.handle_retry_timer();
        }
        ControlFlow::Continue(())
    }

    fn on_command(&mut self, cmd: Option<SessionCommand>) -> ControlFlow<()> {
        match cmd {
            Some(SessionCommand::Shutdown) => return ControlFlow::Break(()),
            Some(cmd) => self.handle_command(cmd),
            None => self.handle_handles_closed(),
        }
        ControlFlow::Continue(())
    }

    /// No caller can stop or shut the session down any more: stop tracking
    /// and keep going only until the buffer is delivered.
    fn handle_handles_closed(&mut self) {
        self.handles_closed = true;
        if self.state.stop(|| self.interval.unsubscribe()) == Transition::Stopped {
            info!("All session handles dropped while tracking; stopped");
        }
        self.flush();
        if !self.is_drained() {
            info!(
                buffered = self.sync.buffered(),
                phase = %self.sync.phase(),
                "All session handles dropped; delivering remaining samples"
            );
        }
    }

    fn is_drained(&self) -> bool {
        self.sync.phase() == SyncPhase::Idle && self.sync.buffered() == 0
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Start { reply } => {
                let result = self.state.start(|| self.interval.subscribe());
                let _ = reply.send(result);
            }
            SessionCommand::Stop { reply } => {
                let transition = self.state.stop(|| self.interval.unsubscribe());
                if transition == Transition::Stopped {
                    self.flush();
                }
                let _ = reply.send(transition);
            }
            SessionCommand::Reconfigure {
                interval_millis,
                reply,
            } => {
                let _ = reply.send(self.interval.reconfigure(interval_millis));
            }
            SessionCommand::ForceSync { reply } => {
                self.flush();
                let _ = reply.send(());
            }
            SessionCommand::CurrentFix { reply } => {
                if !self.state.has_permission() {
                    warn!("Cannot get current location: location permission not granted");
                    let _ = reply.send(Err(TrackingError::PermissionDenied));
                    return;
                }
                let query = Arc::clone(&self.fix_query);
                tokio::spawn(async move {
                    let result = query.current_fix().await.map_err(TrackingError::from);
                    let _ = reply.send(result);
                });
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn handle_fix(&mut self, event: FixEvent) {
        if !self.interval.is_current(event.generation) {
            debug!(generation = event.generation, "Discarding fix from stale subscription");
            return;
        }

        let Some(subject) = self.subject.load_full() else {
            warn!("Fix dropped: subject identifier not set");
            return;
        };

        let now = self.clock.now_millis();
        if !self.gate.accept(&event.fix, now) {
            return;
        }

        let sample = LocationSample::from_fix(&event.fix, &subject, &self.device_info, now);
        debug!(%sample, "Location recorded");
        self.sync.enqueue(sample);

        if let Some(attempt) = self.sync.trigger(now) {
            self.dispatch(attempt);
        }
    }

    fn handle_outcome(&mut self, outcome: DeliveryOutcome) {
        match self.sync.complete(outcome.attempt, outcome.result) {
            SyncAction::None => {}
            SyncAction::SendNow => {
                let now = self.clock.now_millis();
                if let Some(attempt) = self.sync.force(now) {
                    self.dispatch(attempt);
                }
            }
            SyncAction::RetryAfter(delay) => {
                self.retry_at = Some(Instant::now() + delay);
            }
        }
    }

    fn handle_retry_timer(&mut self) {
        self.retry_at = None;
        let now = self.clock.now_millis();
        if let Some(attempt) = self.sync.retry_due(now) {
            self.dispatch(attempt);
        }
    }

    /// Forced drain + send, cancelling any pending retry wait
    fn flush(&mut self) {
        let now = self.clock.now_millis();
        if let Some(attempt) = self.sync.force(now) {
            self.dispatch(attempt);
        } else if self.sync.phase() != SyncPhase::RetryScheduled {
            self.retry_at = None;
        }
    }

    /// Hand an attempt to a delivery task; its outcome comes back through `done_rx`
    fn dispatch(&mut self, attempt: SyncAttempt) {
        self.retry_at = None;
        let transport = Arc::clone(&self.transport);
        let done_tx = self.done_tx.clone();

        tokio::spawn(async move {
            let result = transport.send_batch(&attempt.batch).await;
            // Receiver gone means the session shut down; the batch is lost with it
            let _ = done_tx.send(DeliveryOutcome { attempt, result });
        });
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state.state(),
            phase: self.sync.phase(),
            buffered: self.sync.buffered(),
            config: self.interval.current(),
            subject_id: self.subject.load_full().map(|s| s.as_ref().clone()),
            last_accepted_at: self.gate.last_accepted_at(),
            retry_pending: self.retry_at.is_some(),
        }
    }
}

/// Trimmed subject id, or None when blank
pub(crate) fn normalize_subject(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
