//! Shared fixtures for engine integration tests.
//!
//! The fakes here stand in for the two network services and the device
//! stores, so the suites under `tests/` can drive the whole engine
//! through [`AppState`] without any real I/O.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use scancart_client::config::ClientConfig;
use scancart_client::http::{ApiResponse, ErrorBody, HttpClient, TransportError};
use scancart_client::recognition::{
    CapturedImage, ImageTranscoder, RecognitionResponse, RecognitionService, TranscodeError,
};
use scancart_client::state::AppState;
use scancart_client::storage::{MemoryCredentialStore, MemoryKeyValueStore};

/// Install a subscriber that logs into the test harness. Safe to call
/// from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Configuration pointing at hosts no test ever reaches.
#[must_use]
pub fn test_config() -> ClientConfig {
    ClientConfig::new(
        "https://shop.test/api/v1".parse().unwrap(),
        "https://recognize.test/recognize".parse().unwrap(),
    )
}

// =============================================================================
// Envelope and payload builders
// =============================================================================

/// Successful envelope carrying `data`.
#[must_use]
pub fn ok_with(data: Value) -> ApiResponse {
    ApiResponse {
        success: true,
        data: Some(data),
        ..ApiResponse::default()
    }
}

/// Successful envelope with no payload.
#[must_use]
pub fn ok_empty() -> ApiResponse {
    ApiResponse {
        success: true,
        ..ApiResponse::default()
    }
}

/// Successful envelope carrying `data` and a session token.
#[must_use]
pub fn ok_with_token(data: Value, token: &str) -> ApiResponse {
    ApiResponse {
        success: true,
        data: Some(data),
        token: Some(token.to_string()),
        ..ApiResponse::default()
    }
}

/// Failed envelope carrying an error message.
#[must_use]
pub fn rejected(message: &str) -> ApiResponse {
    ApiResponse {
        success: false,
        error: Some(ErrorBody::Message(message.to_string())),
        ..ApiResponse::default()
    }
}

/// Product payload the way the backend sends it.
#[must_use]
pub fn product_json(id: &str, name: &str, price: &str) -> Value {
    json!({ "_id": id, "name": name, "price": price, "stockQuantity": 25, "images": [] })
}

/// Profile payload the way the backend sends it.
#[must_use]
pub fn profile_json(id: &str, name: &str, email: &str) -> Value {
    json!({ "_id": id, "name": name, "email": email, "role": "customer" })
}

// =============================================================================
// Fake backend transport
// =============================================================================

/// What the engine sent through the fake transport.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

/// Scripted [`HttpClient`]: canned envelopes per `"METHOD /path"` route.
///
/// Responses on a route are served in order and the last one sticks, so a
/// single [`FakeHttpClient::respond`] serves any number of calls.
/// Unrouted requests fail like an unreachable backend.
#[derive(Default)]
pub struct FakeHttpClient {
    routes: Mutex<HashMap<String, VecDeque<Result<ApiResponse, String>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    bearer: Mutex<Option<String>>,
}

impl FakeHttpClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an envelope for a route like `"POST /auth/login"`.
    pub fn respond(&self, route: &str, response: ApiResponse) {
        self.routes
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push_back(Ok(response));
    }

    /// Queue a transport failure for a route.
    pub fn fail(&self, route: &str, message: &str) {
        self.routes
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push_back(Err(message.to_string()));
    }

    /// Requests seen so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The bearer token currently installed on the transport.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        self.bearer.lock().unwrap().clone()
    }

    fn dispatch(
        &self,
        method: &'static str,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<ApiResponse, TransportError> {
        let mut path_with_query = path.to_string();
        for (i, (name, value)) in query.iter().enumerate() {
            path_with_query.push(if i == 0 { '?' } else { '&' });
            path_with_query.push_str(name);
            path_with_query.push('=');
            path_with_query.push_str(value);
        }
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            path: path_with_query.clone(),
            body,
        });

        let route = format!("{method} {path_with_query}");
        let mut routes = self.routes.lock().unwrap();
        let Some(queue) = routes.get_mut(&route) else {
            return Err(TransportError::Request(format!("no fake route for {route}")));
        };
        let Some(next) = queue.pop_front() else {
            return Err(TransportError::Request(format!("route exhausted: {route}")));
        };
        if queue.is_empty() {
            queue.push_back(next.clone());
        }
        next.map_err(TransportError::Request)
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse, TransportError> {
        self.dispatch("GET", path, query, None)
    }

    async fn post(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<ApiResponse, TransportError> {
        self.dispatch("POST", path, &[], Some(body.clone()))
    }

    fn set_bearer_token(&self, token: Option<SecretString>) {
        *self.bearer.lock().unwrap() = token.map(|t| t.expose_secret().to_string());
    }
}

// =============================================================================
// Fake recognition service and transcoder
// =============================================================================

/// Scripted [`RecognitionService`] that records every upload's byte size.
pub struct FakeRecognitionService {
    response: Mutex<Result<RecognitionResponse, String>>,
    uploads: Mutex<Vec<usize>>,
}

impl FakeRecognitionService {
    #[must_use]
    pub fn answering(response: RecognitionResponse) -> Self {
        Self {
            response: Mutex::new(Ok(response)),
            uploads: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            response: Mutex::new(Err(message.to_string())),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Replace the scripted answer.
    pub fn set_response(&self, response: RecognitionResponse) {
        *self.response.lock().unwrap() = Ok(response);
    }

    /// Byte sizes of the frames uploaded so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<usize> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecognitionService for FakeRecognitionService {
    async fn recognize(
        &self,
        image: &CapturedImage,
    ) -> Result<RecognitionResponse, TransportError> {
        self.uploads.lock().unwrap().push(image.bytes.len());
        self.response
            .lock()
            .unwrap()
            .clone()
            .map_err(TransportError::Request)
    }
}

/// Transcoder that halves the frame and records the requested quality.
#[derive(Default)]
pub struct FakeTranscoder {
    qualities: Mutex<Vec<f32>>,
}

impl FakeTranscoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Quality factors requested so far.
    #[must_use]
    pub fn qualities(&self) -> Vec<f32> {
        self.qualities.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageTranscoder for FakeTranscoder {
    async fn transcode(
        &self,
        image: &CapturedImage,
        quality: f32,
    ) -> Result<CapturedImage, TranscodeError> {
        self.qualities.lock().unwrap().push(quality);
        let mut bytes = image.bytes.clone();
        bytes.truncate(bytes.len() / 2);
        Ok(CapturedImage {
            bytes,
            mime_type: image.mime_type.clone(),
        })
    }
}

// =============================================================================
// Assembled engine
// =============================================================================

/// A fully assembled engine on fakes, with handles to each fake.
pub struct TestEngine {
    pub state: AppState,
    pub http: Arc<FakeHttpClient>,
    pub recognition: Arc<FakeRecognitionService>,
    pub transcoder: Arc<FakeTranscoder>,
    pub kv: Arc<MemoryKeyValueStore>,
    pub credentials: Arc<MemoryCredentialStore>,
}

impl TestEngine {
    /// Fresh engine: empty stores, no session, no scripted routes.
    #[must_use]
    pub fn new() -> Self {
        Self::assemble_on(
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(MemoryCredentialStore::new()),
        )
    }

    /// Engine whose credential store already holds a session token.
    #[must_use]
    pub fn with_stored_token(token: &str) -> Self {
        Self::assemble_on(
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(MemoryCredentialStore::with_token(token)),
        )
    }

    /// Rebuild the engine on existing stores, like an app restart.
    #[must_use]
    pub fn resume(kv: Arc<MemoryKeyValueStore>, credentials: Arc<MemoryCredentialStore>) -> Self {
        Self::assemble_on(kv, credentials)
    }

    fn assemble_on(
        kv: Arc<MemoryKeyValueStore>,
        credentials: Arc<MemoryCredentialStore>,
    ) -> Self {
        let http = Arc::new(FakeHttpClient::new());
        let recognition = Arc::new(FakeRecognitionService::answering(
            RecognitionResponse::default(),
        ));
        let transcoder = Arc::new(FakeTranscoder::new());
        let state = AppState::assemble(
            test_config(),
            http.clone(),
            recognition.clone(),
            Some(transcoder.clone()),
            kv.clone(),
            credentials.clone(),
        );
        Self {
            state,
            http,
            recognition,
            transcoder,
            kv,
            credentials,
        }
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}
