//! Gateway configuration, read from flags or the environment.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use regex::RegexSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{CookieSettings, GuardPolicy, ProtectedPaths};

/// Which front-end this gateway instance sits in front of.
///
/// Both run the same guard; they differ in which paths need a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GuardProfile {
    /// Everything except the public pages needs a session.
    Portal,
    /// Only the dashboard areas need a session.
    Console,
}

const PORTAL_PUBLIC_PATHS: &[&str] = &[
    "/",
    "/login",
    "/register",
    "/forgot-password",
    "/reset-password",
    "/verify-email",
];

const CONSOLE_PROTECTED_PATTERNS: &[&str] = &[
    r"^/(super-admin|training-admin|trainer|trainee)(/.*)?$",
    r"^/[^/]+/(dashboard|trainings|employees|settings)(/.*)?$",
    r"^/complete-profile/?$",
];

/// Never guarded. Static files are only exempt under the bundle directories; a
/// file extension elsewhere does not make a path public.
const DEFAULT_SKIP_PATTERNS: &[&str] = &[
    r"^/api/",
    r"^/_next/",
    r"^/static/",
    r"^/assets/",
    r"^/(favicon\.ico|robots\.txt|manifest\.json)$",
];

const DEFAULT_COMPANY_PATTERNS: &[&str] = &[
    r"^/(complete-profile|company-profile)(/.*)?$",
    r"^/[^/]+/(dashboard|trainings|employees|settings)(/.*)?$",
];

#[derive(Debug, Clone, Parser)]
#[command(name = "gateway")]
#[command(about = "Session and routing gateway for the training portal front-ends")]
pub struct GatewayConfig {
    /// Base URL of the backend REST API.
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:4000")]
    pub backend_url: String,

    /// Seconds to wait for the backend before giving up on a request.
    #[arg(long, env = "BACKEND_TIMEOUT_SECS", default_value_t = 15)]
    pub backend_timeout_secs: u64,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Deployment environment. Cookies are marked `Secure` only in `production`.
    #[arg(long, env = "RUST_ENV", default_value = "development")]
    pub environment: String,

    /// Whether session cookies are hidden from page scripts. Pick one value per
    /// deployment; every handler uses it.
    #[arg(long, env = "SESSION_COOKIE_HTTP_ONLY", default_value_t = true, action = ArgAction::Set)]
    pub cookie_http_only: bool,

    #[arg(long, env = "GUARD_PROFILE", value_enum, default_value_t = GuardProfile::Portal)]
    pub guard_profile: GuardProfile,

    #[arg(long, env = "LOGIN_PATH", default_value = "/login")]
    pub login_path: String,

    #[arg(long, env = "PROFILE_COMPLETION_PATH", default_value = "/complete-profile")]
    pub profile_completion_path: String,

    /// Public paths for the portal profile (comma-separated). Defaults per profile.
    #[arg(long, env = "GUARD_PUBLIC_PATHS", value_delimiter = ',')]
    pub public_paths: Vec<String>,

    /// Protected path regexes for the console profile (comma-separated).
    #[arg(long, env = "GUARD_PROTECTED_PATTERNS", value_delimiter = ',')]
    pub protected_patterns: Vec<String>,

    /// Company-scoped path regexes admin roles are sent away from (comma-separated).
    #[arg(long, env = "GUARD_COMPANY_PATTERNS", value_delimiter = ',')]
    pub company_patterns: Vec<String>,

    /// Reject tokens past their `exp` claim instead of leaving that to the backend.
    #[arg(long, env = "GUARD_ENFORCE_EXPIRY", default_value_t = false, action = ArgAction::Set)]
    pub enforce_expiry: bool,

    /// Directory holding the built front-end bundle.
    #[arg(long, env = "FRONTEND_DIR", default_value = "frontend/dist")]
    pub frontend_dir: PathBuf,

    /// Allowed CORS origins (comma-separated). Permissive when empty.
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub cors_allowed_origins: Vec<String>,
}

fn or_defaults(values: &[String], defaults: &[&str]) -> Vec<String> {
    let values: Vec<String> = values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        defaults.iter().map(|d| d.to_string()).collect()
    } else {
        values
    }
}

impl GatewayConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            secure: self.is_production(),
            http_only: self.cookie_http_only,
        }
    }

    /// Build the route guard policy for the configured profile.
    pub fn guard_policy(&self) -> Result<GuardPolicy> {
        let protected = match self.guard_profile {
            GuardProfile::Portal => {
                ProtectedPaths::AllExcept(or_defaults(&self.public_paths, PORTAL_PUBLIC_PATHS))
            }
            GuardProfile::Console => {
                let patterns = or_defaults(&self.protected_patterns, CONSOLE_PROTECTED_PATTERNS);
                ProtectedPaths::Patterns(
                    RegexSet::new(&patterns).context("GUARD_PROTECTED_PATTERNS is not valid")?,
                )
            }
        };

        let skip = RegexSet::new(DEFAULT_SKIP_PATTERNS).context("Invalid skip patterns")?;
        let company_scoped =
            RegexSet::new(or_defaults(&self.company_patterns, DEFAULT_COMPANY_PATTERNS))
                .context("GUARD_COMPANY_PATTERNS is not valid")?;

        Ok(GuardPolicy {
            login_path: self.login_path.clone(),
            profile_completion_path: self.profile_completion_path.clone(),
            protected,
            skip,
            company_scoped,
            enforce_expiry: self.enforce_expiry,
        })
    }
}
