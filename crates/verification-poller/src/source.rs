//! Where verification state comes from.

use async_trait::async_trait;
use shared_types::CompanyVerification;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("verification endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable verification body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("verification status is for company {actual}, expected {expected}")]
    CompanyMismatch { expected: String, actual: String },
}

#[async_trait]
pub trait VerificationSource: Send + Sync + 'static {
    async fn fetch(&self, company_id: &str) -> Result<CompanyVerification, PollError>;
}

/// Reads the signed-in company's profile from the backend REST API.
#[derive(Debug, Clone)]
pub struct HttpVerificationSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpVerificationSource {
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self, PollError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self) -> String {
        format!("{}/company-profile/me", self.base_url)
    }
}

#[async_trait]
impl VerificationSource for HttpVerificationSource {
    async fn fetch(&self, company_id: &str) -> Result<CompanyVerification, PollError> {
        tracing::debug!(company_id, "Fetching verification status");

        let response = self
            .client
            .get(self.url())
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PollError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let verification: CompanyVerification = serde_json::from_str(&body)?;
        for_company(company_id, verification)
    }
}

/// `/me` answers for whoever owns the token, which need not be the company asked
/// about. Such an answer says nothing about `company_id`.
fn for_company(
    company_id: &str,
    verification: CompanyVerification,
) -> Result<CompanyVerification, PollError> {
    if verification.id != company_id {
        return Err(PollError::CompanyMismatch {
            expected: company_id.to_string(),
            actual: verification.id,
        });
    }
    Ok(verification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::VerificationStatus;

    fn accepted(id: &str) -> CompanyVerification {
        CompanyVerification {
            id: id.to_string(),
            verification_status: VerificationStatus::Accepted,
            rejection_reason: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_status_for_other_company_is_an_error() {
        let err = for_company("abc-123", accepted("def-456")).unwrap_err();
        assert!(matches!(
            err,
            PollError::CompanyMismatch { ref expected, ref actual }
                if expected == "abc-123" && actual == "def-456"
        ));

        let ok = for_company("abc-123", accepted("abc-123")).unwrap();
        assert_eq!(ok.id, "abc-123");
    }

    #[test]
    fn test_url_ignores_trailing_slash() {
        let source =
            HttpVerificationSource::new("http://api.local/", "tok", Duration::from_secs(1)).unwrap();
        assert_eq!(source.url(), "http://api.local/company-profile/me");
    }
}
