//! Wire shapes shared by both analytics endpoints.
//!
//! Every response is `{ "success": bool, "message": string?, "data": T? }`.

use serde::{Deserialize, Serialize};

use super::TransportError;
use crate::types::LocationSample;

/// Response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Turn a declared-unsuccessful envelope into an application error.
    pub fn into_result(self, status: u16) -> Result<Option<T>, TransportError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(TransportError::Application {
                status,
                message: self.message.unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }
}

/// Body of `POST /api/location/batch`
#[derive(Debug, Serialize)]
pub struct BatchRequest<'a> {
    #[serde(rename = "apiKey")]
    pub api_key: &'a str,
    pub locations: &'a [LocationSample],
}
