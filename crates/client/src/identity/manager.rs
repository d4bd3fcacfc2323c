//! Session lifecycle.
//!
//! Owns the current [`Identity`] and every transition between guest and
//! authenticated sessions. Each transition updates the credential store,
//! the HTTP bearer token, and the cart binding as one unit, so the rest of
//! the engine never observes them disagreeing.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};

use scancart_core::Email;

use crate::cart::CartStore;
use crate::http::{HttpClient, TransportError};
use crate::models::UserProfile;
use crate::storage::keys;
use crate::storage::{CredentialStore, KeyValueStore};

use super::{mint_local_id, AuthError, Identity};

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const ME_PATH: &str = "/auth/me";
const LOGOUT_PATH: &str = "/auth/logout";

/// Drives session state for the whole engine.
///
/// Cheap to clone; all clones share the same session.
#[derive(Clone)]
pub struct IdentityManager {
    inner: Arc<IdentityManagerInner>,
}

struct IdentityManagerInner {
    http: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialStore>,
    kv: Arc<dyn KeyValueStore>,
    cart: CartStore,
    /// `None` until [`IdentityManager::initialize`] has run.
    identity: RwLock<Option<Identity>>,
    /// Serializes transitions so the credential store, bearer token, and
    /// cart binding always move together.
    transition: Mutex<()>,
}

impl IdentityManager {
    pub fn new(
        http: Arc<dyn HttpClient>,
        credentials: Arc<dyn CredentialStore>,
        kv: Arc<dyn KeyValueStore>,
        cart: CartStore,
    ) -> Self {
        Self {
            inner: Arc::new(IdentityManagerInner {
                http,
                credentials,
                kv,
                cart,
                identity: RwLock::new(None),
                transition: Mutex::new(()),
            }),
        }
    }

    /// The current identity, or `None` before [`Self::initialize`].
    pub async fn current(&self) -> Option<Identity> {
        self.inner.identity.read().await.clone()
    }

    /// Restore the previous session, falling back to a guest identity.
    ///
    /// A stored token is validated against the backend before it is
    /// trusted. Any failure along the way - unreadable credential store,
    /// rejected token, unreachable backend - is logged and absorbed: the
    /// shopper always ends up with a working identity and a bound cart.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Identity {
        let _guard = self.inner.transition.lock().await;

        let stored = match self.inner.credentials.get_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "credential store unreadable, starting as guest");
                None
            }
        };

        let Some(token) = stored else {
            return self.become_guest_locked().await;
        };

        self.inner.http.set_bearer_token(Some(token.clone()));
        match self.fetch_profile().await {
            Ok(profile) => {
                debug!(user_id = %profile.id, "restored session");
                let identity = Identity::Authenticated { profile, token };
                self.install_locked(identity.clone()).await;
                identity
            }
            Err(e) => {
                // Token expired, revoked, or the backend is unreachable.
                // Recover silently; the shopper just starts as a guest.
                debug!(error = %e, "stored session not restored");
                self.become_guest_locked().await
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// On success the session token is persisted and the cart switches to
    /// the account bucket, merging any guest cart into it. On failure the
    /// current identity is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEmail`] for a malformed address,
    /// [`AuthError::InvalidCredentials`] when the backend rejects the
    /// sign-in, and [`AuthError::Transport`] when it cannot be reached.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let email = Email::parse(email)?;
        let _guard = self.inner.transition.lock().await;
        let body = serde_json::json!({ "email": email, "password": password });
        self.authenticate_locked(LOGIN_PATH, &body).await
    }

    /// Create an account and sign straight into it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEmail`] for a malformed address,
    /// [`AuthError::InvalidCredentials`] when the backend refuses the
    /// registration, and [`AuthError::Transport`] when it cannot be
    /// reached.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AuthError> {
        let email = Email::parse(email)?;
        let _guard = self.inner.transition.lock().await;
        let body = serde_json::json!({ "name": name, "email": email, "password": password });
        self.authenticate_locked(REGISTER_PATH, &body).await
    }

    /// Skip sign-in and shop as a guest.
    pub async fn continue_as_guest(&self) -> Identity {
        let _guard = self.inner.transition.lock().await;
        self.become_guest_locked().await
    }

    /// Sign out and return to the guest identity.
    ///
    /// The server is told best-effort; local sign-out proceeds whether or
    /// not it answers.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Identity {
        let _guard = self.inner.transition.lock().await;
        match self.inner.http.get(LOGOUT_PATH, &[]).await {
            Ok(envelope) if envelope.success => debug!("server session closed"),
            Ok(envelope) => {
                debug!(error = %envelope.error_message(), "server logout reported failure");
            }
            Err(e) => debug!(error = %e, "server logout unreachable"),
        }
        self.become_guest_locked().await
    }

    /// Shared tail of login and register. Caller holds the transition
    /// lock and has validated the email.
    async fn authenticate_locked(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<UserProfile, AuthError> {
        let envelope = self.inner.http.post(path, body).await?;
        if !envelope.success {
            return Err(AuthError::InvalidCredentials(envelope.error_message()));
        }
        let token = envelope.token.clone().map(SecretString::from).ok_or_else(|| {
            AuthError::Transport(TransportError::Decode(
                "auth response missing token".to_string(),
            ))
        })?;
        let profile: UserProfile = envelope.decode_data()?;

        if let Err(e) = self.inner.credentials.set_token(&token).await {
            warn!(error = %e, "session token not persisted, sign-in will not survive restart");
        }
        self.inner.http.set_bearer_token(Some(token.clone()));
        debug!(user_id = %profile.id, "authenticated");
        self.install_locked(Identity::Authenticated {
            profile: profile.clone(),
            token,
        })
        .await;
        Ok(profile)
    }

    async fn fetch_profile(&self) -> Result<UserProfile, AuthError> {
        let envelope = self.inner.http.get(ME_PATH, &[]).await?;
        if !envelope.success {
            return Err(AuthError::InvalidCredentials(envelope.error_message()));
        }
        Ok(envelope.decode_data::<UserProfile>()?)
    }

    /// Tear down any authenticated state and install a guest identity
    /// backed by the device-local identifier. Caller holds the transition
    /// lock. Never fails.
    async fn become_guest_locked(&self) -> Identity {
        if let Err(e) = self.inner.credentials.delete_token().await {
            warn!(error = %e, "stored session token not cleared");
        }
        self.inner.http.set_bearer_token(None);
        let local_id = self.guest_local_id().await;
        let identity = Identity::Guest { local_id };
        self.install_locked(identity.clone()).await;
        identity
    }

    /// Load the device's guest identifier, minting and persisting one on
    /// first use.
    async fn guest_local_id(&self) -> String {
        match self.inner.kv.get(keys::GUEST_CART_ID).await {
            Ok(Some(id)) if !id.is_empty() => id,
            Ok(_) => {
                let id = mint_local_id();
                if let Err(e) = self.inner.kv.set(keys::GUEST_CART_ID, &id).await {
                    warn!(error = %e, "guest identifier not persisted");
                }
                id
            }
            Err(e) => {
                warn!(error = %e, "guest identifier unreadable, using session-only id");
                mint_local_id()
            }
        }
    }

    /// Swap the in-memory identity and rebind the cart to its bucket.
    ///
    /// Signing in from a guest session merges the guest cart into the
    /// account bucket; every other transition binds plainly. Caller holds
    /// the transition lock.
    async fn install_locked(&self, identity: Identity) {
        let merge = matches!(
            (&*self.inner.identity.read().await, &identity),
            (Some(Identity::Guest { .. }), Identity::Authenticated { .. })
        );
        let bucket = identity.bucket();
        *self.inner.identity.write().await = Some(identity);
        if merge {
            self.inner.cart.rebind_merging(bucket).await;
        } else {
            self.inner.cart.bind(bucket).await;
        }
    }
}
