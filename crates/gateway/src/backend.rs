//! Client for the platform's backend REST API.
//!
//! Handlers only see the `BackendApi` trait. Each call is a single attempt; any
//! status the backend returns is handed back as-is for the caller to interpret.

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared_types::LoginRequest;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned an unreadable body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("backend response is missing {0}")]
    MissingField(&'static str),
}

/// Status and raw body of a backend reply.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: String,
}

impl BackendResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, BackendError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Human-readable error message from a failed reply.
    ///
    /// The backend answers `{ "message": "..." }`, sometimes with a list of
    /// validation messages instead of a string. Anything else falls back to the
    /// raw body, then to the status reason.
    pub fn message(&self) -> String {
        let parsed: Option<Value> = serde_json::from_str(&self.body).ok();
        let from_json = parsed.as_ref().and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|key| match v.get(key) {
                    Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                    Some(Value::Array(items)) if !items.is_empty() => Some(
                        items
                            .iter()
                            .map(|item| match item {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect::<Vec<_>>()
                            .join(", "),
                    ),
                    _ => None,
                })
        });

        from_json
            .or_else(|| Some(self.body.trim().to_string()).filter(|b| !b.is_empty()))
            .unwrap_or_else(|| {
                self.status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            })
    }
}

#[async_trait]
pub trait BackendApi: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, request: &LoginRequest) -> Result<BackendResponse, BackendError>;

    /// `POST /authentication/google`
    async fn google_login(&self, id_token: &str) -> Result<BackendResponse, BackendError>;

    /// `GET /company-profile/me`
    async fn company_profile_me(&self, token: &str) -> Result<BackendResponse, BackendError>;

    /// `PATCH /company-profile/accept-request/{id}`
    async fn accept_company_request(
        &self,
        token: &str,
        company_profile_id: &str,
    ) -> Result<BackendResponse, BackendError>;

    /// `PATCH /company-profile/reject-request/{id}`
    async fn reject_company_request(
        &self,
        token: &str,
        company_profile_id: &str,
        rejection_reason: &str,
    ) -> Result<BackendResponse, BackendError>;
}

/// `reqwest` implementation of [`BackendApi`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read(response: reqwest::Response) -> Result<BackendResponse, BackendError> {
        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.text().await?;
        Ok(BackendResponse { status, body })
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn login(&self, request: &LoginRequest) -> Result<BackendResponse, BackendError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(request)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn google_login(&self, id_token: &str) -> Result<BackendResponse, BackendError> {
        let response = self
            .client
            .post(self.url("/authentication/google"))
            .json(&json!({ "token": id_token }))
            .send()
            .await?;
        Self::read(response).await
    }

    async fn company_profile_me(&self, token: &str) -> Result<BackendResponse, BackendError> {
        let response = self
            .client
            .get(self.url("/company-profile/me"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn accept_company_request(
        &self,
        token: &str,
        company_profile_id: &str,
    ) -> Result<BackendResponse, BackendError> {
        let path = format!(
            "/company-profile/accept-request/{}",
            urlencoding::encode(company_profile_id)
        );
        let response = self
            .client
            .patch(self.url(&path))
            .bearer_auth(token)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn reject_company_request(
        &self,
        token: &str,
        company_profile_id: &str,
        rejection_reason: &str,
    ) -> Result<BackendResponse, BackendError> {
        let path = format!(
            "/company-profile/reject-request/{}",
            urlencoding::encode(company_profile_id)
        );
        let response = self
            .client
            .patch(self.url(&path))
            .bearer_auth(token)
            .json(&json!({ "rejectionReason": rejection_reason }))
            .send()
            .await?;
        Self::read(response).await
    }
}
