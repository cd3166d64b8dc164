//! Transport: request/response access to the analytics server
//!
//! The tracking core needs exactly two capabilities from the network:
//!
//! - **send_batch**: deliver a batch of samples, report success or failure
//! - **fetch_statistics**: pull the precomputed statistics for a subject
//!
//! [`HttpTransport`] implements them over HTTP + JSON. Tests and embedders can
//! supply any other [`Transport`].

mod client;
mod envelope;

pub use client::HttpTransport;
pub use envelope::{ApiEnvelope, BatchRequest};

use async_trait::async_trait;

use crate::types::{LocationSample, UserStatistics};

/// Transport errors.
///
/// Both variants are retried identically by the sync manager; the split only
/// serves logging and statistics callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Server unreachable, connection reset, timeout
    #[error("Network error: {0}")]
    Transport(String),
    /// Server reachable but reported failure (non-2xx, `success: false`, bad body)
    #[error("API Error: {message} (status {status})")]
    Application { status: u16, message: String },
}

impl TransportError {
    pub fn is_transport(&self) -> bool {
        matches!(self, TransportError::Transport(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) if e.is_status() => TransportError::Application {
                status: status.as_u16(),
                message: e.to_string(),
            },
            _ if e.is_decode() => TransportError::Application {
                status: e.status().map_or(0, |s| s.as_u16()),
                message: format!("malformed response: {e}"),
            },
            _ => TransportError::Transport(e.to_string()),
        }
    }
}

/// Abstract wire access used by the sync manager and the statistics client
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Deliver one batch. `Ok(())` only when the server confirmed success.
    async fn send_batch(&self, batch: &[LocationSample]) -> Result<(), TransportError>;

    /// Fetch the statistics summary for `subject_id`.
    async fn fetch_statistics(&self, subject_id: &str) -> Result<UserStatistics, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send_batch(&self, batch: &[LocationSample]) -> Result<(), TransportError> {
        (**self).send_batch(batch).await
    }

    async fn fetch_statistics(&self, subject_id: &str) -> Result<UserStatistics, TransportError> {
        (**self).fetch_statistics(subject_id).await
    }
}
