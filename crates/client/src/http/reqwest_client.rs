//! Production [`HttpClient`] backed by `reqwest`.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::config::ClientConfig;

use super::{ApiResponse, HttpClient, TransportError};

/// Backend API client.
///
/// Joins paths onto the configured base URL, attaches the bearer token when
/// one is set, and parses every response body as the API envelope.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    base_url: Url,
    bearer: RwLock<Option<SecretString>>,
}

impl ReqwestHttpClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the underlying HTTP client
    /// fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            bearer: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        // Paths are written with a leading slash; the base URL carries any
        // path prefix, so join relative to it
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Request(format!("invalid path {path}: {e}")))
    }

    fn bearer_header(&self) -> Option<String> {
        self.bearer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }

    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<ApiResponse, TransportError> {
        let request = match self.bearer_header() {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        // The backend reports failures inside the envelope, so a non-2xx
        // status alone is not a transport error
        serde_json::from_str::<ApiResponse>(&body).map_err(|e| {
            tracing::debug!(
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "response body is not an API envelope"
            );
            TransportError::Decode(format!("HTTP {status}: {e}"))
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint(path)?;
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.dispatch(request).await
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint(path)?;
        self.dispatch(self.client.post(url).json(body)).await
    }

    fn set_bearer_token(&self, token: Option<SecretString>) {
        *self.bearer.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_client() -> ReqwestHttpClient {
        let config = ClientConfig::new(
            "https://api.example.com/api/v1".parse().unwrap(),
            "https://recog.example.com/recognize".parse().unwrap(),
        );
        ReqwestHttpClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_joins_under_base_prefix() {
        let client = test_client();
        let url = client.endpoint("/products/barcode/12345").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/v1/products/barcode/12345"
        );
    }

    #[test]
    fn test_bearer_header_tracks_token() {
        let client = test_client();
        assert!(client.bearer_header().is_none());

        client.set_bearer_token(Some(SecretString::from("jwt-abc")));
        assert_eq!(client.bearer_header().as_deref(), Some("Bearer jwt-abc"));

        client.set_bearer_token(None);
        assert!(client.bearer_header().is_none());
    }
}
