//! Edge middleware that gates page requests.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::AppState;

use super::policy::GuardDecision;
use super::role_router::ROOT_ROUTE;
use super::session::SessionStore;

/// Run the guard policy before any page is served.
///
/// Use with `axum::middleware::from_fn_with_state`. Decoded claims are left in the
/// request extensions for whatever handles the page.
pub async fn route_guard(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !state.policy.intercepts(&path) {
        return next.run(request).await;
    }

    let mut session = SessionStore::from_headers(request.headers(), state.cookies);
    let (guard_state, decision) = state.policy.evaluate(
        &path,
        request.uri().query(),
        session.token(),
        Utc::now().timestamp(),
    );

    match decision {
        GuardDecision::Pass => {
            if let Some(claims) = guard_state.claims() {
                request.extensions_mut().insert(claims.clone());
            }
            next.run(request).await
        }
        GuardDecision::Redirect {
            location,
            clear_session,
        } => {
            tracing::debug!(
                state = guard_state.name(),
                "Redirecting {} to {}",
                path,
                location
            );
            let mut response = temporary_redirect(&location);
            if clear_session {
                session.clear_session();
                session.apply(response.headers_mut());
            }
            response
        }
    }
}

/// 307 to `location`, or to the root route when `location` is not a valid header.
fn temporary_redirect(location: &str) -> Response {
    let value = HeaderValue::from_str(location).unwrap_or_else(|_| {
        tracing::warn!("Redirect target is not a valid header value, using {}", ROOT_ROUTE);
        HeaderValue::from_static(ROOT_ROUTE)
    });
    (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, value)]).into_response()
}
