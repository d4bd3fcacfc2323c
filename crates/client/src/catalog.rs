//! Product catalog lookups.
//!
//! Scan resolution hits the same handful of products over and over, so
//! id and barcode lookups go through a small in-memory cache with a short
//! TTL. Name search always goes to the backend; its result set changes
//! with every keystroke and is not worth caching.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use scancart_core::ProductId;

use crate::http::{HttpClient, TransportError};
use crate::models::Product;

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Errors surfaced by catalog lookups.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The backend answered but knows no such product.
    #[error("product not found")]
    NotFound,

    /// The backend could not be reached or answered with garbage.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Client for the product endpoints of the backend.
///
/// Cheap to clone; all clones share the same cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    http: Arc<dyn HttpClient>,
    cache: Cache<String, Product>,
}

impl CatalogClient {
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();
        Self {
            inner: Arc::new(CatalogClientInner { http, cache }),
        }
    }

    /// Fetch a product by its id.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] when the backend rejects the id
    /// and [`LookupError::Transport`] when it cannot be reached.
    #[instrument(skip(self))]
    pub async fn product_by_id(&self, id: &ProductId) -> Result<Product, LookupError> {
        let cache_key = format!("id:{id}");
        if let Some(product) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for product id");
            return Ok(product);
        }

        let envelope = self.inner.http.get(&format!("/products/{id}"), &[]).await?;
        if !envelope.success {
            debug!(error = %envelope.error_message(), "product id lookup rejected");
            return Err(LookupError::NotFound);
        }
        let product: Product = envelope.decode_data()?;
        self.inner.cache.insert(cache_key, product.clone()).await;
        Ok(product)
    }

    /// Fetch a product by barcode.
    ///
    /// A hit also primes the id cache entry, since a barcode resolution is
    /// usually followed by id-keyed traffic for the same product.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] when no product carries the code
    /// and [`LookupError::Transport`] when the backend cannot be reached.
    #[instrument(skip(self))]
    pub async fn product_by_barcode(&self, code: &str) -> Result<Product, LookupError> {
        let cache_key = format!("barcode:{code}");
        if let Some(product) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for barcode");
            return Ok(product);
        }

        let envelope = self
            .inner
            .http
            .get(&format!("/products/barcode/{code}"), &[])
            .await?;
        if !envelope.success {
            debug!(error = %envelope.error_message(), "barcode lookup rejected");
            return Err(LookupError::NotFound);
        }
        let product: Product = envelope.decode_data()?;
        self.inner
            .cache
            .insert(format!("id:{}", product.id), product.clone())
            .await;
        self.inner.cache.insert(cache_key, product.clone()).await;
        Ok(product)
    }

    /// Search products by name. Uncached.
    ///
    /// An empty result is a successful lookup, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Transport`] when the backend cannot be
    /// reached or reports a failure.
    #[instrument(skip(self))]
    pub async fn search(&self, name: &str) -> Result<Vec<Product>, LookupError> {
        let envelope = self.inner.http.get("/products", &[("name", name)]).await?;
        if !envelope.success {
            return Err(LookupError::Transport(TransportError::Request(
                envelope.error_message(),
            )));
        }
        Ok(envelope.decode_data()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use secrecy::SecretString;
    use serde_json::json;

    use crate::http::ApiResponse;

    use super::*;

    /// Serves canned envelopes keyed by request path and counts calls.
    struct ScriptedHttp {
        responses: Mutex<HashMap<String, ApiResponse>>,
        calls: AtomicUsize,
    }

    impl ScriptedHttp {
        fn new(responses: impl IntoIterator<Item = (String, ApiResponse)>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttp {
        async fn get(
            &self,
            path: &str,
            query: &[(&str, &str)],
        ) -> Result<ApiResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut key = path.to_string();
            for (name, value) in query {
                key.push_str(&format!("?{name}={value}"));
            }
            self.responses
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .ok_or_else(|| TransportError::Request(format!("no script for {key}")))
        }

        async fn post(
            &self,
            path: &str,
            _body: &serde_json::Value,
        ) -> Result<ApiResponse, TransportError> {
            Err(TransportError::Request(format!("unexpected post to {path}")))
        }

        fn set_bearer_token(&self, _token: Option<SecretString>) {}
    }

    fn found(product: serde_json::Value) -> ApiResponse {
        ApiResponse {
            success: true,
            data: Some(product),
            ..ApiResponse::default()
        }
    }

    fn rejected(message: &str) -> ApiResponse {
        ApiResponse {
            success: false,
            error: Some(crate::http::ErrorBody::Message(message.to_string())),
            ..ApiResponse::default()
        }
    }

    fn milk() -> serde_json::Value {
        json!({ "_id": "p1", "name": "Milk", "price": "3.49", "stockQuantity": 12 })
    }

    #[tokio::test]
    async fn test_product_by_id_caches() {
        let http = Arc::new(ScriptedHttp::new([("/products/p1".to_string(), found(milk()))]));
        let catalog = CatalogClient::new(http.clone());

        let first = catalog.product_by_id(&ProductId::new("p1")).await.unwrap();
        let second = catalog.product_by_id(&ProductId::new("p1")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_barcode_hit_primes_id_cache() {
        let http = Arc::new(ScriptedHttp::new([(
            "/products/barcode/590123412345".to_string(),
            found(milk()),
        )]));
        let catalog = CatalogClient::new(http.clone());

        let by_code = catalog.product_by_barcode("590123412345").await.unwrap();
        let by_id = catalog.product_by_id(&by_code.id).await.unwrap();
        assert_eq!(by_code, by_id);
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let http = Arc::new(ScriptedHttp::new([(
            "/products/ghost".to_string(),
            rejected("Product not found"),
        )]));
        let catalog = CatalogClient::new(http);

        let err = catalog
            .product_by_id(&ProductId::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::NotFound));
    }

    #[tokio::test]
    async fn test_search_decodes_list_and_skips_cache() {
        let http = Arc::new(ScriptedHttp::new([(
            "/products?name=milk".to_string(),
            found(json!([milk()])),
        )]));
        let catalog = CatalogClient::new(http.clone());

        let results = catalog.search("milk").await.unwrap();
        assert_eq!(results.len(), 1);
        catalog.search("milk").await.unwrap();
        assert_eq!(http.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport() {
        let http = Arc::new(ScriptedHttp::new([]));
        let catalog = CatalogClient::new(http);

        let err = catalog
            .product_by_id(&ProductId::new("p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Transport(_)));
    }
}
