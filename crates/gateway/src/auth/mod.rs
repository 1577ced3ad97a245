//! Authentication, session and role-based routing.
//!
//! This module provides:
//! - Token payload decoding (no signature checks)
//! - The cookie-backed `SessionStore`
//! - Login, Google login, logout and session handlers
//! - `route_guard` middleware and the per-app `GuardPolicy` it runs
//! - Role to landing-route mapping

mod handlers;
mod middleware;
pub mod policy;
pub mod role_router;
pub mod session;
pub mod token;
pub mod types;

pub use handlers::{current_session, google_login, login, logout};
pub use middleware::route_guard;
pub use policy::{GuardDecision, GuardPolicy, GuardState, ProtectedPaths};
pub use role_router::{landing_route, map_role_to_route};
pub use session::{CookieSettings, SessionStore, SESSION_MAX_AGE_SECS};
pub use token::{decode, DecodeError};
pub use types::{DecodedClaims, RoleClaims, Session};
