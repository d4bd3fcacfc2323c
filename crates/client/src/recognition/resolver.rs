//! Scan resolution.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::catalog::CatalogClient;
use crate::models::Product;
use crate::recent::RecentProducts;

use super::compress::compress_for_upload;
use super::{
    interpret, CapturedImage, ImageTranscoder, RecognitionError, RecognitionOutcome,
    RecognitionService,
};

/// Resolves captured frames into catalog products.
///
/// Cheap to clone; all clones share one scan generation, so starting a
/// scan anywhere supersedes in-flight scans everywhere.
#[derive(Clone)]
pub struct RecognitionResolver {
    inner: Arc<RecognitionResolverInner>,
}

struct RecognitionResolverInner {
    service: Arc<dyn RecognitionService>,
    transcoder: Option<Arc<dyn ImageTranscoder>>,
    catalog: CatalogClient,
    recent: RecentProducts,
    /// Bumped by every [`RecognitionResolver::resolve`] and
    /// [`RecognitionResolver::supersede`]. A scan's result only counts
    /// while its claimed generation is still the current one.
    generation: AtomicU64,
}

impl RecognitionResolver {
    #[must_use]
    pub fn new(
        service: Arc<dyn RecognitionService>,
        transcoder: Option<Arc<dyn ImageTranscoder>>,
        catalog: CatalogClient,
        recent: RecentProducts,
    ) -> Self {
        Self {
            inner: Arc::new(RecognitionResolverInner {
                service,
                transcoder,
                catalog,
                recent,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Invalidate any in-flight scan without starting a new one, e.g.
    /// when the scanner screen is dismissed.
    pub fn supersede(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Run the whole pipeline for one frame: compress, submit,
    /// interpret, resolve against the catalog, and record the product in
    /// the recents list.
    ///
    /// Starting a new scan invalidates this one; an invalidated scan
    /// returns [`RecognitionError::Superseded`] and records nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RecognitionError::NotRecognized`] when nothing in the
    /// frame was recognizable, [`RecognitionError::Transport`] when the
    /// recognition service failed, [`RecognitionError::Lookup`] when the
    /// catalog rejected the recognized reference, and
    /// [`RecognitionError::Superseded`] when a newer scan overtook this
    /// one.
    #[instrument(skip(self, image), fields(bytes = image.bytes.len()))]
    pub async fn resolve(&self, image: CapturedImage) -> Result<Product, RecognitionError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let upload = compress_for_upload(self.inner.transcoder.as_deref(), image).await;
        let response = self.inner.service.recognize(&upload).await?;
        self.ensure_current(generation)?;

        let product = match interpret(response) {
            RecognitionOutcome::Barcode(code) => {
                debug!(code, "barcode recognized");
                self.inner.catalog.product_by_barcode(&code).await?
            }
            RecognitionOutcome::ProductId(id) => {
                debug!(product_id = %id, "product reference recognized");
                self.inner.catalog.product_by_id(&id).await?
            }
            RecognitionOutcome::InlineProduct(product) => product,
            RecognitionOutcome::NotRecognized => return Err(RecognitionError::NotRecognized),
            RecognitionOutcome::Failed(reason) => return Err(RecognitionError::Transport(reason)),
        };

        // A scan that lost to a newer one must not touch the recents.
        self.ensure_current(generation)?;
        self.inner.recent.record(product.clone());
        Ok(product)
    }

    fn ensure_current(&self, generation: u64) -> Result<(), RecognitionError> {
        if self.inner.generation.load(Ordering::SeqCst) == generation {
            Ok(())
        } else {
            debug!("scan superseded, result discarded");
            Err(RecognitionError::Superseded)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use tokio::sync::Notify;

    use scancart_core::ProductId;

    use crate::http::{ApiResponse, HttpClient, TransportError};
    use crate::recognition::RecognitionResponse;

    use super::*;

    fn inline_product() -> Product {
        Product {
            id: ProductId::new("p9"),
            name: "Inline".to_string(),
            price: Decimal::ONE,
            stock_quantity: 1,
            images: Vec::new(),
            description: None,
        }
    }

    /// Catalog transport that must never be reached.
    struct NoHttp;

    #[async_trait]
    impl HttpClient for NoHttp {
        async fn get(
            &self,
            path: &str,
            _query: &[(&str, &str)],
        ) -> Result<ApiResponse, TransportError> {
            Err(TransportError::Request(format!("unexpected get {path}")))
        }

        async fn post(
            &self,
            path: &str,
            _body: &serde_json::Value,
        ) -> Result<ApiResponse, TransportError> {
            Err(TransportError::Request(format!("unexpected post {path}")))
        }

        fn set_bearer_token(&self, _token: Option<SecretString>) {}
    }

    /// Always answers immediately with a canned response.
    struct InstantService(RecognitionResponse);

    #[async_trait]
    impl RecognitionService for InstantService {
        async fn recognize(
            &self,
            _image: &CapturedImage,
        ) -> Result<RecognitionResponse, TransportError> {
            Ok(self.0.clone())
        }
    }

    /// Blocks mid-recognition until the test releases it.
    struct GatedService {
        response: RecognitionResponse,
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl RecognitionService for GatedService {
        async fn recognize(
            &self,
            _image: &CapturedImage,
        ) -> Result<RecognitionResponse, TransportError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(self.response.clone())
        }
    }

    fn resolver_with(service: Arc<dyn RecognitionService>, recent: RecentProducts) -> RecognitionResolver {
        RecognitionResolver::new(service, None, CatalogClient::new(Arc::new(NoHttp)), recent)
    }

    #[tokio::test]
    async fn test_inline_product_resolves_and_records() {
        let recent = RecentProducts::new();
        let service = Arc::new(InstantService(RecognitionResponse {
            product: Some(inline_product()),
            ..RecognitionResponse::default()
        }));
        let resolver = resolver_with(service, recent.clone());

        let product = resolver
            .resolve(CapturedImage::jpeg(vec![0u8; 10]))
            .await
            .unwrap();
        assert_eq!(product.id, ProductId::new("p9"));
        assert_eq!(recent.list().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_recognized_records_nothing() {
        let recent = RecentProducts::new();
        let service = Arc::new(InstantService(RecognitionResponse::default()));
        let resolver = resolver_with(service, recent.clone());

        let err = resolver
            .resolve(CapturedImage::jpeg(vec![0u8; 10]))
            .await
            .unwrap_err();
        assert!(matches!(err, RecognitionError::NotRecognized));
        assert!(recent.list().is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_surfaces_reason() {
        let service = Arc::new(InstantService(RecognitionResponse {
            error: Some("model unavailable".to_string()),
            ..RecognitionResponse::default()
        }));
        let resolver = resolver_with(service, RecentProducts::new());

        let err = resolver
            .resolve(CapturedImage::jpeg(vec![0u8; 10]))
            .await
            .unwrap_err();
        match err {
            RecognitionError::Transport(reason) => assert_eq!(reason, "model unavailable"),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_supersede_discards_in_flight_scan() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let recent = RecentProducts::new();
        let service = Arc::new(GatedService {
            response: RecognitionResponse {
                product: Some(inline_product()),
                ..RecognitionResponse::default()
            },
            started: started.clone(),
            release: release.clone(),
        });
        let resolver = resolver_with(service, recent.clone());

        let racing = resolver.clone();
        let handle =
            tokio::spawn(async move { racing.resolve(CapturedImage::jpeg(vec![0u8; 10])).await });
        started.notified().await;
        resolver.supersede();
        release.notify_one();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(RecognitionError::Superseded)));
        assert!(recent.list().is_empty());
    }

    #[tokio::test]
    async fn test_newer_scan_wins_over_older() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let recent = RecentProducts::new();
        let service = Arc::new(GatedService {
            response: RecognitionResponse {
                product: Some(inline_product()),
                ..RecognitionResponse::default()
            },
            started: started.clone(),
            release: release.clone(),
        });
        let resolver = resolver_with(service, recent.clone());

        let racing = resolver.clone();
        let stale =
            tokio::spawn(async move { racing.resolve(CapturedImage::jpeg(vec![0u8; 10])).await });
        started.notified().await;

        let fresh = resolver.clone();
        let winning =
            tokio::spawn(async move { fresh.resolve(CapturedImage::jpeg(vec![0u8; 10])).await });
        started.notified().await;
        release.notify_one();
        release.notify_one();

        assert!(matches!(
            stale.await.unwrap(),
            Err(RecognitionError::Superseded)
        ));
        assert!(winning.await.unwrap().is_ok());
        assert_eq!(recent.list().len(), 1);
    }
}
