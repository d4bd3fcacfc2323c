//! Engine assembly.

use std::sync::Arc;

use crate::cart::CartStore;
use crate::catalog::CatalogClient;
use crate::config::ClientConfig;
use crate::http::{HttpClient, ReqwestHttpClient, TransportError};
use crate::identity::{Identity, IdentityManager};
use crate::recent::RecentProducts;
use crate::recognition::{
    HttpRecognitionService, ImageTranscoder, RecognitionResolver, RecognitionService,
};
use crate::storage::{CredentialStore, KeyValueStore};

/// The assembled engine, the one value an embedding app holds on to.
///
/// This struct is cheaply cloneable via `Arc`; all clones share the same
/// session, cart, and caches.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    identity: IdentityManager,
    cart: CartStore,
    catalog: CatalogClient,
    recognition: RecognitionResolver,
    recent: RecentProducts,
}

impl AppState {
    /// Assemble the engine with live HTTP transports.
    ///
    /// No image transcoder is wired here; frames upload at captured size
    /// until the host supplies one through [`AppState::assemble`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when an HTTP client cannot be
    /// constructed.
    pub fn new(
        config: ClientConfig,
        kv: Arc<dyn KeyValueStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, TransportError> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(&config)?);
        let recognition: Arc<dyn RecognitionService> =
            Arc::new(HttpRecognitionService::new(&config)?);
        Ok(Self::assemble(config, http, recognition, None, kv, credentials))
    }

    /// Assemble the engine from parts.
    ///
    /// Hosts use this to plug in platform transports and codecs; tests
    /// use it to plug in fakes.
    #[must_use]
    pub fn assemble(
        config: ClientConfig,
        http: Arc<dyn HttpClient>,
        recognition_service: Arc<dyn RecognitionService>,
        transcoder: Option<Arc<dyn ImageTranscoder>>,
        kv: Arc<dyn KeyValueStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let cart = CartStore::new(kv.clone());
        let catalog = CatalogClient::new(http.clone());
        let recent = RecentProducts::new();
        let recognition = RecognitionResolver::new(
            recognition_service,
            transcoder,
            catalog.clone(),
            recent.clone(),
        );
        let identity = IdentityManager::new(http, credentials, kv, cart.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                cart,
                catalog,
                recognition,
                recent,
            }),
        }
    }

    /// Restore the previous session. Call once at startup; every other
    /// operation assumes it has run.
    pub async fn initialize(&self) -> Identity {
        self.inner.identity.initialize().await
    }

    /// Get a reference to the engine configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the session manager.
    #[must_use]
    pub fn identity(&self) -> &IdentityManager {
        &self.inner.identity
    }

    /// Get a reference to the cart.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the catalog client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Get a reference to the scan resolver.
    #[must_use]
    pub fn recognition(&self) -> &RecognitionResolver {
        &self.inner.recognition
    }

    /// Get a reference to the recently scanned products.
    #[must_use]
    pub fn recent(&self) -> &RecentProducts {
        &self.inner.recent
    }
}
