//! User roles as assigned by the backend.

use serde::{Deserialize, Serialize};

/// Account role with different permission levels.
///
/// Shoppers sign up as [`Role::Customer`]; the remaining roles belong to
/// store staff accounts that share the same authentication endpoints. The
/// engine treats them identically - role-gated behavior lives in the
/// presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular shopper account.
    #[default]
    Customer,
    /// Point-of-sale operator.
    Cashier,
    /// Store manager.
    Manager,
    /// Full administrative access.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Cashier => write!(f, "cashier"),
            Self::Manager => write!(f, "manager"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "cashier" => Ok(Self::Cashier),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Customer, Role::Cashier, Role::Manager, Role::Admin] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn test_role_serde_snake_case() {
        let json = serde_json::to_string(&Role::Cashier).unwrap();
        assert_eq!(json, "\"cashier\"");
    }
}
