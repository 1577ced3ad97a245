//! Authentication HTTP handlers.
//!
//! Login flows forward credentials to the backend, turn a successful reply into
//! session cookies, and hand the backend body back to the browser together with
//! the route it should land on.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use shared_types::{
    AuthSuccessResponse, GoogleLoginRequest, LoginRequest, MessageResponse, SessionSummary,
};

use crate::backend::{BackendError, BackendResponse};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::role_router::{landing_route, landing_route_for};
use super::session::{SessionStore, SESSION_MAX_AGE_SECS};
use super::token;
use super::types::{Role, Session};

/// The fields of a sign-in reply the gateway acts on. Everything else is passed
/// through untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInBody {
    token: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    is_profile_filled: Option<bool>,
    #[serde(default)]
    company_profile_id: Option<String>,
    #[serde(default)]
    profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignInFlow {
    Password,
    Google,
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload?;
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let reply = state.backend.login(&payload).await?;
    complete_sign_in(&state, reply, SignInFlow::Password)
}

/// `POST /api/auth/google`
pub async fn google_login(
    State(state): State<AppState>,
    payload: Result<Json<GoogleLoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload?;
    if payload.id_token.trim().is_empty() {
        return Err(ApiError::bad_request("Google credential is required"));
    }

    let reply = state.backend.google_login(&payload.id_token).await?;
    complete_sign_in(&state, reply, SignInFlow::Google)
}

fn complete_sign_in(
    state: &AppState,
    reply: BackendResponse,
    flow: SignInFlow,
) -> ApiResult<Response> {
    if !reply.is_success() {
        return Err(ApiError::Upstream {
            status: reply.status,
            message: reply.message(),
        });
    }

    let data: Value = reply.json()?;
    let body: SignInBody = serde_json::from_value(data.clone()).map_err(BackendError::from)?;
    let raw_token = body
        .token
        .filter(|t| !t.is_empty())
        .ok_or(BackendError::MissingField("token"))?;

    let claims = match token::decode(&raw_token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::warn!("Backend issued a token we cannot decode: {}", e);
            None
        }
    };

    let role = body
        .role
        .as_deref()
        .and_then(|r| r.parse::<Role>().ok())
        .or_else(|| claims.as_ref().and_then(|c| c.role()));
    let company_profile_id = body
        .company_profile_id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| {
            claims
                .as_ref()
                .and_then(|c| c.company_profile_id().map(str::to_string))
        });
    let is_profile_filled = body
        .is_profile_filled
        .or_else(|| claims.as_ref().map(|c| c.is_profile_filled))
        .unwrap_or(false);

    let session = Session {
        token: raw_token,
        role,
        company_profile_id,
        expires_at: claims.as_ref().map(|c| c.expires_at),
    };

    let mut store = SessionStore::new(state.cookies);
    store.set_session(&session, SESSION_MAX_AGE_SECS);
    if flow == SignInFlow::Google {
        if let Some(id) = session.company_profile_id.as_deref() {
            store.set_company_info(id, SESSION_MAX_AGE_SECS);
        }
    }
    if let Some(url) = body.profile_picture_url.as_deref().filter(|u| !u.is_empty()) {
        store.set_profile_picture(url, SESSION_MAX_AGE_SECS);
    }

    let redirect_to = landing_route(
        session.role,
        session.company_profile_id.as_deref(),
        is_profile_filled,
        &state.policy.profile_completion_path,
    );

    tracing::info!(
        flow = ?flow,
        role = session.role.map(|r| r.as_str()).unwrap_or("none"),
        "Sign-in succeeded, landing on {}",
        redirect_to
    );

    let mut response = Json(AuthSuccessResponse { data, redirect_to }).into_response();
    store.apply(response.headers_mut());
    Ok(response)
}

/// `POST /api/auth/logout`
///
/// Always succeeds; clearing cookies that were never set is harmless.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut store = SessionStore::from_headers(&headers, state.cookies);
    let had_session = store.token().is_some();
    store.clear_session();

    tracing::info!(had_session, "Session cleared");

    let mut response = Json(MessageResponse {
        message: "Logged out".to_string(),
    })
    .into_response();
    store.apply(response.headers_mut());
    response
}

/// `GET /api/auth/session`
pub async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionSummary>> {
    let store = SessionStore::from_headers(&headers, state.cookies);
    let raw_token = store
        .token()
        .ok_or_else(|| ApiError::unauthorized("Missing authentication"))?;
    let claims =
        token::decode(raw_token).map_err(|_| ApiError::unauthorized("Invalid session"))?;

    let redirect_to = landing_route_for(&claims, &state.policy.profile_completion_path);

    Ok(Json(SessionSummary {
        subject_id: claims.subject_id.clone(),
        email: claims.email.clone(),
        role: claims.role(),
        company_profile_id: claims.company_profile_id().map(str::to_string),
        is_profile_filled: claims.is_profile_filled,
        expires_at: claims.expires_at,
        redirect_to,
    }))
}
