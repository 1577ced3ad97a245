//! Session and routing gateway for the training portal front-ends.
//!
//! The gateway owns the browser session: it signs users in through the backend,
//! keeps the session in cookies, and runs the route guard in front of every page.

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod auth;
pub mod backend;
pub mod company;
pub mod config;
pub mod error;

use auth::{CookieSettings, GuardPolicy};
use backend::{BackendApi, HttpBackend};
use config::GatewayConfig;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn BackendApi>,
    pub policy: Arc<GuardPolicy>,
    pub cookies: CookieSettings,
}

impl AppState {
    pub fn new(backend: Arc<dyn BackendApi>, policy: GuardPolicy, cookies: CookieSettings) -> Self {
        Self {
            backend,
            policy: Arc::new(policy),
            cookies,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let backend = HttpBackend::new(&config.backend_url, config.backend_timeout())?;
        Ok(Self::new(
            Arc::new(backend),
            config.guard_policy()?,
            config.cookie_settings(),
        ))
    }
}

/// API routes plus the guarded page host.
///
/// Anything that is not an API route falls through to `pages`, which only runs
/// after the route guard has let the request pass.
pub fn build_app(state: AppState, pages: Router) -> Router {
    let pages = pages.layer(middleware::from_fn_with_state(
        state.clone(),
        auth::route_guard,
    ));

    Router::new()
        .route("/health", get(health_check))
        // Session routes
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/google", post(auth::google_login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/session", get(auth::current_session))
        // Company profile proxy
        .route(
            "/api/company-profile/me",
            get(company::my_company_profile),
        )
        .route(
            "/api/company-profile/accept-request/:id",
            patch(company::accept_company_request),
        )
        .route(
            "/api/company-profile/reject-request/:id",
            patch(company::reject_company_request),
        )
        .with_state(state)
        .fallback_service(pages)
        .layer(TraceLayer::new_for_http())
}

/// Serve the built front-end, falling back to `index.html` for client-side routes.
pub fn page_host(frontend_dir: &Path) -> Router {
    if frontend_dir.exists() {
        tracing::info!("Serving frontend from {}", frontend_dir.display());
        let index_path = frontend_dir.join("index.html");
        let serve_dir = ServeDir::new(frontend_dir).not_found_service(ServeFile::new(index_path));
        Router::new().fallback_service(serve_dir)
    } else {
        tracing::info!(
            "Frontend directory not found at {}, serving API only",
            frontend_dir.display()
        );
        Router::new().fallback(|| async { (StatusCode::NOT_FOUND, "Not found") })
    }
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}
