//! Session identity.
//!
//! A session is always exactly one of two things: a guest with a
//! device-local identifier, or an authenticated account with a profile and
//! bearer token. There is no "logged out" third state - signing out lands
//! back on the guest identity, whose cart is still on the device.

mod error;
mod manager;

pub use error::AuthError;
pub use manager::IdentityManager;

use core::fmt;

use rand::distr::{Alphanumeric, SampleString};
use secrecy::SecretString;

use scancart_core::UserId;

use crate::models::UserProfile;
use crate::storage::keys;

/// Random suffix length of a minted guest identifier.
const GUEST_SUFFIX_LEN: usize = 7;

/// Who the current session belongs to.
#[derive(Clone)]
pub enum Identity {
    /// Anonymous shopper identified by a device-local id.
    Guest {
        /// Persistent device-local identifier, reused across restarts.
        local_id: String,
    },
    /// Signed-in account.
    Authenticated {
        /// Profile returned by the backend.
        profile: UserProfile,
        /// Bearer token for authenticated requests.
        token: SecretString,
    },
}

impl Identity {
    /// The cart bucket this identity owns.
    #[must_use]
    pub fn bucket(&self) -> BucketKey {
        match self {
            Self::Guest { local_id } => BucketKey::Guest(local_id.clone()),
            Self::Authenticated { profile, .. } => BucketKey::User(profile.id.clone()),
        }
    }

    /// Whether this is a signed-in account.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// The signed-in profile, if any.
    #[must_use]
    pub const fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Guest { .. } => None,
            Self::Authenticated { profile, .. } => Some(profile),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest { local_id } => f
                .debug_struct("Guest")
                .field("local_id", local_id)
                .finish(),
            Self::Authenticated { profile, .. } => f
                .debug_struct("Authenticated")
                .field("profile", profile)
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Namespaced key of a cart bucket.
///
/// Displays as `guest:<localId>` or `user:<userId>`; the cart snapshot for
/// a bucket is stored under [`BucketKey::storage_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketKey {
    /// Guest bucket, keyed by the device-local identifier.
    Guest(String),
    /// Account bucket, keyed by the backend user id.
    User(UserId),
}

impl BucketKey {
    /// Key the bucket's cart snapshot is stored under.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}{self}", keys::CART_PREFIX)
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest(local_id) => write!(f, "guest:{local_id}"),
            Self::User(user_id) => write!(f, "user:{user_id}"),
        }
    }
}

/// Mint a fresh guest identifier: epoch millis plus a short random suffix.
///
/// The `guest:` namespace comes from [`BucketKey`], not the identifier
/// itself.
pub(crate) fn mint_local_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = Alphanumeric
        .sample_string(&mut rand::rng(), GUEST_SUFFIX_LEN)
        .to_lowercase();
    format!("{millis}_{suffix}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use scancart_core::Email;

    fn profile() -> UserProfile {
        UserProfile {
            id: UserId::new("u42"),
            name: "Sam".to_string(),
            email: Email::parse("sam@example.com").unwrap(),
            role: None,
        }
    }

    #[test]
    fn test_guest_bucket_key() {
        let identity = Identity::Guest {
            local_id: "1719922191_ab3kz9q".to_string(),
        };
        let bucket = identity.bucket();
        assert_eq!(bucket.to_string(), "guest:1719922191_ab3kz9q");
        assert_eq!(bucket.storage_key(), "cart_guest:1719922191_ab3kz9q");
    }

    #[test]
    fn test_user_bucket_key() {
        let identity = Identity::Authenticated {
            profile: profile(),
            token: SecretString::from("jwt"),
        };
        let bucket = identity.bucket();
        assert_eq!(bucket.to_string(), "user:u42");
        assert_eq!(bucket.storage_key(), "cart_user:u42");
    }

    #[test]
    fn test_debug_redacts_token() {
        let identity = Identity::Authenticated {
            profile: profile(),
            token: SecretString::from("super-secret-jwt"),
        };
        let debug_output = format!("{identity:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-jwt"));
    }

    #[test]
    fn test_minted_ids_are_distinct_and_well_formed() {
        let a = mint_local_id();
        let b = mint_local_id();
        assert_ne!(a, b);

        let (millis, suffix) = a.split_once('_').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), GUEST_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
