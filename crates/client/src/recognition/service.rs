//! Recognition service transport.
//!
//! The recognition endpoint is a separate deployment from the shop
//! backend: it takes a multipart frame upload and answers with plain
//! JSON, no envelope and no authentication.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::instrument;
use url::Url;

use crate::config::ClientConfig;
use crate::http::TransportError;

use super::{CapturedImage, RecognitionResponse};

/// Form field the service expects the frame under.
const IMAGE_PART: &str = "image";
/// File name attached to the uploaded frame.
const IMAGE_FILE_NAME: &str = "product_image.jpg";

/// Submits captured frames for recognition.
#[async_trait]
pub trait RecognitionService: Send + Sync {
    /// Upload a frame and return the service's raw answer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the service cannot be reached,
    /// answers with a non-success status, or sends undecodable JSON.
    async fn recognize(
        &self,
        image: &CapturedImage,
    ) -> Result<RecognitionResponse, TransportError>;
}

/// [`RecognitionService`] over multipart HTTP.
#[derive(Debug, Clone)]
pub struct HttpRecognitionService {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpRecognitionService {
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.recognition_url.clone(),
        })
    }
}

#[async_trait]
impl RecognitionService for HttpRecognitionService {
    #[instrument(skip(self, image), fields(bytes = image.bytes.len()))]
    async fn recognize(
        &self,
        image: &CapturedImage,
    ) -> Result<RecognitionResponse, TransportError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(IMAGE_FILE_NAME)
            .mime_str(&image.mime_type)
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let form = Form::new().part(IMAGE_PART, part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Request(format!(
                "recognition service returned {status}"
            )));
        }
        response
            .json::<RecognitionResponse>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}
