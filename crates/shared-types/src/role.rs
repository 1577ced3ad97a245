//! Platform roles as carried in the token `role` claim and the `user_role` cookie.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every role the platform issues.
///
/// The set is closed: routing decisions `match` on it exhaustively, so adding a
/// role fails to compile until every table handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_SUPER_ADMIN")]
    SuperAdmin,
    #[serde(rename = "ROLE_TRAINING_ADMIN")]
    TrainingAdmin,
    #[serde(rename = "ROLE_COMPANY_ADMIN")]
    CompanyAdmin,
    #[serde(rename = "ROLE_TRAINER")]
    Trainer,
    #[serde(rename = "ROLE_TRAINEE")]
    Trainee,
}

/// Coarse grouping used by the route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    /// Platform-wide administrators, never scoped to a company.
    Admin,
    /// Administrator of a single company profile.
    Company,
    Member,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::TrainingAdmin,
        Role::CompanyAdmin,
        Role::Trainer,
        Role::Trainee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "ROLE_SUPER_ADMIN",
            Role::TrainingAdmin => "ROLE_TRAINING_ADMIN",
            Role::CompanyAdmin => "ROLE_COMPANY_ADMIN",
            Role::Trainer => "ROLE_TRAINER",
            Role::Trainee => "ROLE_TRAINEE",
        }
    }

    pub fn kind(&self) -> RoleKind {
        match self {
            Role::SuperAdmin | Role::TrainingAdmin => RoleKind::Admin,
            Role::CompanyAdmin => RoleKind::Company,
            Role::Trainer | Role::Trainee => RoleKind::Member,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.kind() == RoleKind::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_string_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!("ROLE_JANITOR".parse::<Role>().is_err());
        assert!("company_admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_kinds() {
        assert_eq!(Role::SuperAdmin.kind(), RoleKind::Admin);
        assert_eq!(Role::TrainingAdmin.kind(), RoleKind::Admin);
        assert_eq!(Role::CompanyAdmin.kind(), RoleKind::Company);
        assert!(!Role::Trainer.is_admin());
    }

    #[test]
    fn test_role_serde_uses_claim_strings() {
        let json = serde_json::to_string(&Role::CompanyAdmin).unwrap();
        assert_eq!(json, r#""ROLE_COMPANY_ADMIN""#);
        let parsed: Role = serde_json::from_str(r#""ROLE_TRAINER""#).unwrap();
        assert_eq!(parsed, Role::Trainer);
    }
}
