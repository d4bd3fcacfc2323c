use thiserror::Error;

use scancart_core::EmailError;

use crate::http::TransportError;

/// Errors surfaced by sign-in and registration.
///
/// A rejected stored token is not represented here: session restore heals
/// itself into a guest identity instead of failing.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The supplied email address is not structurally valid.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The backend rejected the credentials.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The backend could not be reached or answered with garbage.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
