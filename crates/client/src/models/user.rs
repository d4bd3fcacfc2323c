//! Authenticated user profile.

use serde::{Deserialize, Serialize};

use scancart_core::{Email, Role, UserId};

/// Profile of the signed-in user, as returned by `/auth/me` and the
/// login/register endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Backend identifier.
    #[serde(alias = "_id")]
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: Email,
    /// Account role. Absent on older accounts, which are plain customers.
    #[serde(default)]
    pub role: Option<Role>,
}
