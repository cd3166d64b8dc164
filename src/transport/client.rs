//! HTTP transport: reqwest client for the analytics server
//!
//! Handles batch uploads and statistics requests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::envelope::{ApiEnvelope, BatchRequest};
use super::{Transport, TransportError};
use crate::config::SessionConfig;
use crate::types::{LocationSample, UserStatistics};

/// HTTP client for the analytics server
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport for the server and credentials in `config`.
    pub fn new(config: &SessionConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| TransportError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.server_url.trim().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Server base URL without trailing slash (for logging)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn batch_url(&self) -> String {
        format!("{}/api/location/batch", self.base_url)
    }

    fn statistics_url(&self) -> String {
        format!("{}/api/user/statistics", self.base_url)
    }

    /// Read an envelope, mapping non-2xx and `success: false` to application errors.
    async fn read_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<Option<T>, TransportError> {
        let status = resp.status();
        let body = resp.bytes().await?;

        let envelope = serde_json::from_slice::<ApiEnvelope<T>>(&body);

        if !status.is_success() {
            let message = envelope
                .ok()
                .and_then(|env| env.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
            return Err(TransportError::Application {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = envelope.map_err(|e| TransportError::Application {
            status: status.as_u16(),
            message: format!("malformed response: {e}"),
        })?;
        envelope.into_result(status.as_u16())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_batch(&self, batch: &[LocationSample]) -> Result<(), TransportError> {
        debug!(count = batch.len(), "Sending locations to server");

        let body = BatchRequest {
            api_key: &self.api_key,
            locations: batch,
        };

        let resp = self.http.post(self.batch_url()).json(&body).send().await?;
        let status = resp.status();

        match Self::read_envelope::<serde_json::Value>(resp).await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(status = status.as_u16(), error = %e, "Location batch rejected");
                Err(e)
            }
        }
    }

    async fn fetch_statistics(&self, subject_id: &str) -> Result<UserStatistics, TransportError> {
        let resp = self
            .http
            .get(self.statistics_url())
            .query(&[("api_key", self.api_key.as_str()), ("user_id", subject_id)])
            .send()
            .await?;
        let status = resp.status();

        match Self::read_envelope::<UserStatistics>(resp).await? {
            Some(stats) => Ok(stats),
            None => Err(TransportError::Application {
                status: status.as_u16(),
                message: "statistics response carried no data".to_string(),
            }),
        }
    }
}
