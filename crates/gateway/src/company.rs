//! Company-profile endpoints, proxied with the caller's session token.
//!
//! The browser never has to read the token cookie to call these; the gateway
//! attaches it as a bearer token.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use shared_types::RejectRequestBody;

use crate::auth::SessionStore;
use crate::backend::BackendResponse;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn session_token(state: &AppState, headers: &HeaderMap) -> ApiResult<String> {
    SessionStore::from_headers(headers, state.cookies)
        .token()
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication"))
}

/// Pass a backend reply through: JSON body and status on success, the usual error
/// shape otherwise.
fn relay(reply: BackendResponse) -> ApiResult<Response> {
    if !reply.is_success() {
        return Err(ApiError::Upstream {
            status: reply.status,
            message: reply.message(),
        });
    }
    if reply.body.trim().is_empty() {
        return Ok(reply.status.into_response());
    }
    let body: Value = reply.json()?;
    Ok((reply.status, Json(body)).into_response())
}

/// `GET /api/company-profile/me`
pub async fn my_company_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let token = session_token(&state, &headers)?;
    let reply = state.backend.company_profile_me(&token).await?;
    relay(reply)
}

/// `PATCH /api/company-profile/accept-request/:id`
pub async fn accept_company_request(
    State(state): State<AppState>,
    Path(company_profile_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let token = session_token(&state, &headers)?;
    let reply = state
        .backend
        .accept_company_request(&token, &company_profile_id)
        .await?;
    if reply.is_success() {
        tracing::info!("Company profile {} accepted", company_profile_id);
    }
    relay(reply)
}

/// `PATCH /api/company-profile/reject-request/:id`
pub async fn reject_company_request(
    State(state): State<AppState>,
    Path(company_profile_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<RejectRequestBody>, JsonRejection>,
) -> ApiResult<Response> {
    let token = session_token(&state, &headers)?;
    let Json(payload) = payload?;
    let reason = payload.rejection_reason.trim();
    if reason.is_empty() {
        return Err(ApiError::bad_request("A rejection reason is required"));
    }

    let reply = state
        .backend
        .reject_company_request(&token, &company_profile_id, reason)
        .await?;
    if reply.is_success() {
        tracing::info!("Company profile {} rejected", company_profile_id);
    }
    relay(reply)
}
