//! Statistics client: read-only access to server-computed user statistics
//!
//! Not part of the buffering/retry path: every call is a single independent
//! request with no retry and no caching, and every failure goes straight back
//! to the caller.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::transport::{Transport, TransportError};
use crate::types::UserStatistics;

/// Statistics fetch errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatisticsError {
    /// Subject id empty; no request was made
    #[error("User identifier not set")]
    MissingIdentifier,
    #[error("statistics fetch failed: {0}")]
    FetchFailed(#[from] TransportError),
}

/// Thin request/response accessor over a [`Transport`]
#[derive(Clone)]
pub struct StatisticsClient {
    transport: Arc<dyn Transport>,
}

impl StatisticsClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetch the statistics summary for `subject_id`.
    pub async fn fetch_statistics(&self, subject_id: &str) -> Result<UserStatistics, StatisticsError> {
        if subject_id.trim().is_empty() {
            return Err(StatisticsError::MissingIdentifier);
        }

        debug!(subject = subject_id, "Fetching user statistics");
        self.transport
            .fetch_statistics(subject_id)
            .await
            .map_err(|e| {
                warn!(subject = subject_id, error = %e, "Error getting statistics");
                StatisticsError::FetchFailed(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocationSample;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Transport that answers statistics from a fixed result and counts calls
    struct CannedTransport {
        calls: AtomicUsize,
        seen_subjects: Mutex<Vec<String>>,
        response: Result<UserStatistics, TransportError>,
    }

    impl CannedTransport {
        fn new(response: Result<UserStatistics, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen_subjects: Mutex::new(Vec::new()),
                response,
            })
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send_batch(&self, _batch: &[LocationSample]) -> Result<(), TransportError> {
            Ok(())
        }

        async fn fetch_statistics(&self, subject_id: &str) -> Result<UserStatistics, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_subjects.lock().unwrap().push(subject_id.to_string());
            self.response.clone()
        }
    }

    fn stats(user: &str) -> UserStatistics {
        UserStatistics {
            user_id: user.to_string(),
            total_locations: 3,
            distance_traveled_meters: 850.0,
            first_location_timestamp: Some(1),
            last_location_timestamp: Some(2),
            city_visits: Default::default(),
            common_stops: Vec::new(),
            activity_hours: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_empty_subject_makes_no_request() {
        let transport = CannedTransport::new(Ok(stats("u1")));
        let client = StatisticsClient::new(transport.clone());

        assert_eq!(client.fetch_statistics("").await, Err(StatisticsError::MissingIdentifier));
        assert_eq!(client.fetch_statistics("   ").await, Err(StatisticsError::MissingIdentifier));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_returns_payload() {
        let transport = CannedTransport::new(Ok(stats("u1")));
        let client = StatisticsClient::new(transport.clone());

        let result = client.fetch_statistics("u1").await.unwrap();
        assert_eq!(result.total_locations, 3);
        assert_eq!(*transport.seen_subjects.lock().unwrap(), vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_surfaces_without_retry() {
        let transport = CannedTransport::new(Err(TransportError::Application {
            status: 404,
            message: "User not found".to_string(),
        }));
        let client = StatisticsClient::new(transport.clone());

        let err = client.fetch_statistics("ghost").await.unwrap_err();
        assert!(matches!(err, StatisticsError::FetchFailed(TransportError::Application { status: 404, .. })));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }
}
