//! Caller-facing handle to a running tracking session

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use super::actor::{normalize_subject, SessionCommand};
use super::SessionStatus;
use crate::source::PermissionCheck;
use crate::statistics::{StatisticsClient, StatisticsError};
use crate::tracking::{TrackingError, Transition};
use crate::types::{RawFix, TrackingConfig, UserStatistics};

/// Handle to interact with a SessionActor. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    subject: Arc<ArcSwapOption<String>>,
    permission: Arc<dyn PermissionCheck>,
    statistics: StatisticsClient,
}

impl SessionHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<SessionCommand>,
        subject: Arc<ArcSwapOption<String>>,
        permission: Arc<dyn PermissionCheck>,
        statistics: StatisticsClient,
    ) -> Self {
        Self {
            tx,
            subject,
            permission,
            statistics,
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, TrackingError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| TrackingError::SessionClosed)?;
        response.await.map_err(|_| TrackingError::SessionClosed)
    }

    /// Start tracking. Refused with `PermissionDenied` if position access is not granted.
    pub async fn start(&self) -> Result<Transition, TrackingError> {
        self.request(|reply| SessionCommand::Start { reply }).await?
    }

    /// Stop tracking and issue one forced flush of the buffer before returning.
    ///
    /// In-flight or pending deliveries are not cancelled.
    pub async fn stop(&self) -> Result<Transition, TrackingError> {
        self.request(|reply| SessionCommand::Stop { reply }).await
    }

    /// Change the sampling interval; restarts the fix subscription if tracking.
    pub async fn reconfigure(&self, interval_millis: i64) -> Result<TrackingConfig, TrackingError> {
        self.request(|reply| SessionCommand::Reconfigure {
            interval_millis,
            reply,
        })
        .await?
    }

    /// Send whatever is buffered now, through the single-flight path.
    pub async fn force_sync(&self) -> Result<(), TrackingError> {
        self.request(|reply| SessionCommand::ForceSync { reply }).await
    }

    /// Last known fix from the provider. Does not affect the sampling gate.
    pub async fn current_fix(&self) -> Result<Option<RawFix>, TrackingError> {
        self.request(|reply| SessionCommand::CurrentFix { reply }).await?
    }

    pub async fn status(&self) -> Result<SessionStatus, TrackingError> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    /// Whether tracking is active. A closed session reports false.
    pub async fn is_tracking(&self) -> bool {
        self.status().await.is_ok_and(|s| s.state.is_active())
    }

    /// Whether position access is currently granted, i.e. whether `start()`
    /// would pass its permission check. Answered without the actor.
    pub fn has_permission(&self) -> bool {
        self.permission.is_granted()
    }

    /// Set the subject attached to subsequent samples. A blank id clears it.
    pub fn set_subject_id(&self, subject_id: &str) {
        let subject = normalize_subject(subject_id);
        info!(subject = subject.as_deref().unwrap_or("<none>"), "User identifier set");
        self.subject.store(subject.map(Arc::new));
    }

    pub fn subject_id(&self) -> Option<String> {
        self.subject.load_full().map(|s| s.as_ref().clone())
    }

    /// Fetch statistics for the session's current subject.
    pub async fn fetch_statistics(&self) -> Result<UserStatistics, StatisticsError> {
        let subject = self.subject.load_full();
        let subject_id = subject.as_deref().map_or("", String::as_str);
        self.statistics.fetch_statistics(subject_id).await
    }

    /// Statistics client sharing this session's transport
    pub fn statistics(&self) -> &StatisticsClient {
        &self.statistics
    }

    /// Stop the actor loop. Buffered samples that were never delivered are dropped.
    ///
    /// Dropping every handle instead lets the session finish delivering first.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(SessionCommand::Shutdown).await;
    }
}
