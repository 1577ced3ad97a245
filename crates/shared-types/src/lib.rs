use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod role;

pub use role::{Role, RoleKind, UnknownRole};

// Cookie names shared by every front-end of the platform.
pub const TOKEN_COOKIE: &str = "token";
pub const ROLE_COOKIE: &str = "user_role";
pub const COMPANY_INFO_COOKIE: &str = "company_info";
pub const PROFILE_PICTURE_COOKIE: &str = "profile_picture_url";

/// Every cookie the session subsystem may write, in the order they are cleared.
pub const SESSION_COOKIES: [&str; 4] = [
    TOKEN_COOKIE,
    ROLE_COOKIE,
    COMPANY_INFO_COOKIE,
    PROFILE_PICTURE_COOKIE,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

/// Contents of the `company_info` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub id: String,
}

/// Successful auth response: the backend body, untouched, plus the landing route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSuccessResponse {
    pub data: serde_json::Value,
    pub redirect_to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// What the gateway knows about the caller's session, as decoded from the cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub subject_id: String,
    pub email: String,
    pub role: Option<Role>,
    pub company_profile_id: Option<String>,
    pub is_profile_filled: bool,
    pub expires_at: i64,
    pub redirect_to: String,
}

/// Backend-controlled approval state of a company profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            VerificationStatus::Pending => "PENDING",
            VerificationStatus::Accepted => "ACCEPTED",
            VerificationStatus::Rejected => "REJECTED",
        }
    }

    /// Accepted is terminal; nothing changes after it.
    pub fn is_resolved(&self) -> bool {
        matches!(self, VerificationStatus::Accepted)
    }
}

/// The part of `GET /company-profile/me` the poller cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyVerification {
    pub id: String,
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequestBody {
    pub rejection_reason: String,
}
