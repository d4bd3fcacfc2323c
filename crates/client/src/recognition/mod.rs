//! Scan-to-product pipeline.
//!
//! A captured frame goes through four stages: compress (size-tiered, best
//! effort), submit to the recognition service, interpret the answer, and
//! resolve it to a catalog [`Product`]. Interpretation is a strict
//! priority order - a barcode beats a product id beats an inline product -
//! so a service that fills several fields still yields one deterministic
//! outcome.

mod compress;
mod resolver;
mod service;

pub use compress::{quality_for_size, ImageTranscoder, TranscodeError};
pub use resolver::RecognitionResolver;
pub use service::{HttpRecognitionService, RecognitionService};

use core::fmt;

use serde::Deserialize;
use thiserror::Error;

use scancart_core::ProductId;

use crate::catalog::LookupError;
use crate::http::TransportError;
use crate::models::Product;

/// One frame captured by the scanner.
#[derive(Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl CapturedImage {
    /// A JPEG frame, the scanner's native output.
    #[must_use]
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "image/jpeg".to_string(),
        }
    }
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Raw answer of the recognition service.
///
/// Every field is optional; the service fills whichever it could extract.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResponse {
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default)]
    pub error: Option<String>,
}

/// What a [`RecognitionResponse`] means, after priority selection.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    /// A barcode to look up in the catalog.
    Barcode(String),
    /// A catalog id to look up.
    ProductId(ProductId),
    /// The service returned the product itself.
    InlineProduct(Product),
    /// The service answered but recognized nothing.
    NotRecognized,
    /// The service reported a failure of its own.
    Failed(String),
}

/// Pick the single outcome of a response.
///
/// Empty strings count as absent, so a service that sends `"barcode": ""`
/// does not shadow a usable product id.
#[must_use]
pub fn interpret(response: RecognitionResponse) -> RecognitionOutcome {
    if let Some(code) = response.barcode
        && !code.is_empty()
    {
        return RecognitionOutcome::Barcode(code);
    }
    if let Some(id) = response.product_id
        && !id.as_str().is_empty()
    {
        return RecognitionOutcome::ProductId(id);
    }
    if let Some(product) = response.product {
        return RecognitionOutcome::InlineProduct(product);
    }
    if let Some(reason) = response.error
        && !reason.is_empty()
    {
        return RecognitionOutcome::Failed(reason);
    }
    RecognitionOutcome::NotRecognized
}

/// Errors surfaced by scan resolution.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The image went through but nothing in it was recognizable.
    #[error("nothing recognizable in the image")]
    NotRecognized,

    /// The recognition service could not be reached, answered with
    /// garbage, or reported a failure of its own.
    #[error("recognition failed: {0}")]
    Transport(String),

    /// A newer scan started before this one finished; its result was
    /// discarded.
    #[error("superseded by a newer scan")]
    Superseded,

    /// Recognition succeeded but the catalog lookup did not.
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl From<TransportError> for RecognitionError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e.to_string())
    }
}
