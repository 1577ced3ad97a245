//! Claims and session types.

use serde::{Deserialize, Serialize};

pub use shared_types::{Role, RoleKind};

/// Role-dependent part of the claims.
///
/// The company profile id only means something for company administrators, so it
/// lives on that variant instead of as an always-optional field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleClaims {
    /// Platform administrator, never scoped to a company.
    Admin(Role),
    CompanyAdmin { company_profile_id: Option<String> },
    Member(Role),
    /// The token had no role claim, or one we don't recognize.
    Unassigned,
}

impl RoleClaims {
    pub fn from_role(role: Option<Role>, company_profile_id: Option<String>) -> Self {
        match role.map(|r| (r, r.kind())) {
            Some((role, RoleKind::Admin)) => RoleClaims::Admin(role),
            Some((_, RoleKind::Company)) => RoleClaims::CompanyAdmin {
                company_profile_id: company_profile_id.filter(|id| !id.trim().is_empty()),
            },
            Some((role, RoleKind::Member)) => RoleClaims::Member(role),
            None => RoleClaims::Unassigned,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            RoleClaims::Admin(role) | RoleClaims::Member(role) => Some(*role),
            RoleClaims::CompanyAdmin { .. } => Some(Role::CompanyAdmin),
            RoleClaims::Unassigned => None,
        }
    }

    pub fn company_profile_id(&self) -> Option<&str> {
        match self {
            RoleClaims::CompanyAdmin { company_profile_id } => company_profile_id.as_deref(),
            _ => None,
        }
    }
}

/// Decoded token payload.
///
/// Only the token codec builds these. Nothing here has been verified; the backend
/// enforces authorization on every API call, the gateway only routes on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedClaims {
    pub subject_id: String,
    pub email: String,
    pub is_profile_filled: bool,
    /// Unix seconds.
    pub expires_at: i64,
    pub role: RoleClaims,
}

impl DecodedClaims {
    pub fn role(&self) -> Option<Role> {
        self.role.role()
    }

    pub fn company_profile_id(&self) -> Option<&str> {
        self.role.company_profile_id()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Session as persisted in cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub role: Option<Role>,
    pub company_profile_id: Option<String>,
    pub expires_at: Option<i64>,
}
