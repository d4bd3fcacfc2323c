//! Backend API transport.
//!
//! Every backend endpoint wraps its payload in the same JSON envelope:
//!
//! ```json
//! { "success": true, "data": { ... }, "token": "...", "error": "..." }
//! ```
//!
//! [`HttpClient`] is the seam the engine talks through. The production
//! implementation is [`ReqwestHttpClient`]; tests and platform adapters
//! substitute their own. A response that parses as the envelope is returned
//! as-is regardless of HTTP status - the backend reports failures through
//! `success: false`, and callers decide what a failed envelope means for
//! their operation.

mod reqwest_client;

pub use reqwest_client::ReqwestHttpClient;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors below the envelope: the request never completed, or the body was
/// not the expected shape.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Request could not be sent, timed out, or the connection dropped.
    #[error("request failed: {0}")]
    Request(String),

    /// Response body did not parse as the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// The backend's response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the operation succeeded.
    #[serde(default)]
    pub success: bool,
    /// Operation payload, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Session token, returned by login and register.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Failure detail when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Failure detail in the envelope.
///
/// Older backend routes return a bare string, newer ones an object with a
/// `message` field. Both deserialize here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    /// Plain error string.
    Message(String),
    /// Structured error object.
    Detailed {
        /// Human-readable failure description.
        message: String,
    },
}

impl ErrorBody {
    /// The human-readable failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Message(message) | Self::Detailed { message } => message,
        }
    }
}

impl ApiResponse {
    /// The failure message, or a generic fallback when the backend sent
    /// `success: false` with no detail.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .map_or_else(|| "request failed".to_string(), |e| e.message().to_string())
    }

    /// Decode `data` into a concrete payload type.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] if `data` is absent or does not
    /// match the expected shape.
    pub fn decode_data<T: serde::de::DeserializeOwned>(self) -> Result<T, TransportError> {
        let data = self
            .data
            .ok_or_else(|| TransportError::Decode("response envelope has no data".to_string()))?;
        serde_json::from_value(data).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Backend API transport seam.
///
/// Implementations must return the parsed envelope for any response body
/// that is one, reserving [`TransportError`] for requests that never
/// produced an envelope at all.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a GET request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request fails below the envelope.
    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse, TransportError>;

    /// Send a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request fails below the envelope.
    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse, TransportError>;

    /// Replace the bearer token attached to subsequent requests.
    ///
    /// `None` clears the token.
    fn set_bearer_token(&self, token: Option<SecretString>);
}
