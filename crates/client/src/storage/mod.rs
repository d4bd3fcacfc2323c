//! Durable storage seams.
//!
//! Two stores with different security postures:
//!
//! - [`KeyValueStore`] - plain app storage (cart snapshots, the guest
//!   identifier). Backed by `AsyncStorage`-style adapters on device and
//!   [`FileKeyValueStore`] elsewhere.
//! - [`CredentialStore`] - the session token only. Backed by the platform
//!   keychain on device; never by plain files in production.
//!
//! Storage failures never abort a shopping flow. Callers log them and move
//! on, so implementations should make errors descriptive.

mod file;
mod memory;

pub use file::FileKeyValueStore;
pub use memory::{MemoryCredentialStore, MemoryKeyValueStore};

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Stored content could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serde(String),
}

/// Well-known storage keys.
pub mod keys {
    /// Key holding the persistent guest identifier.
    pub const GUEST_CART_ID: &str = "guestCartId";

    /// Prefix for per-identity cart snapshots. The full key is the prefix
    /// followed by the bucket key, e.g. `cart_guest:1719922191_ab3kz9q`.
    pub const CART_PREFIX: &str = "cart_";
}

/// Plain key-value string store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backing store cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backing store cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backing store cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Secure store for the session token.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the secure store cannot be read.
    async fn get_token(&self) -> Result<Option<SecretString>, StorageError>;

    /// Persist the token, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the secure store cannot be written.
    async fn set_token(&self, token: &SecretString) -> Result<(), StorageError>;

    /// Delete the stored token. Deleting an absent token is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the secure store cannot be written.
    async fn delete_token(&self) -> Result<(), StorageError>;
}
