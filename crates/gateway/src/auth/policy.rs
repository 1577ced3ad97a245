//! Route guard policy.
//!
//! Every front-end runs the same state machine; they differ only in which paths
//! count as protected and where their login page lives. `GuardPolicy` holds those
//! per-app knobs and turns (path, token) into a pass or a redirect.

use regex::RegexSet;

use super::role_router::{map_role_to_route, ROOT_ROUTE};
use super::token;
use super::types::{DecodedClaims, Role, RoleClaims};

/// Which paths require a session.
#[derive(Debug, Clone)]
pub enum ProtectedPaths {
    /// Everything except the listed public paths (and their sub-paths).
    AllExcept(Vec<String>),
    /// Only paths matching one of the patterns.
    Patterns(RegexSet),
}

impl ProtectedPaths {
    pub fn is_protected(&self, path: &str) -> bool {
        match self {
            ProtectedPaths::AllExcept(public) => !public.iter().any(|p| path_matches(path, p)),
            ProtectedPaths::Patterns(set) => set.is_match(path),
        }
    }
}

/// `path` equals `prefix` or lives under it. The root only matches itself.
fn path_matches(path: &str, prefix: &str) -> bool {
    let path = normalize(path);
    let prefix = normalize(prefix);
    if prefix == ROOT_ROUTE {
        return path == ROOT_ROUTE;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => ROOT_ROUTE,
        trimmed => trimmed,
    }
}

/// Paths under a role's own dashboard root, e.g. `/trainer/...`.
fn is_role_area(path: &str) -> bool {
    Role::ALL
        .into_iter()
        .filter(|role| *role != Role::CompanyAdmin)
        .any(|role| {
            let home = map_role_to_route(role, None);
            home.split('/')
                .nth(1)
                .is_some_and(|area| path_matches(path, &format!("/{}", area)))
        })
}

/// Where a request stands before any rule is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Anonymous,
    /// A token cookie is present but cannot be decoded (or is expired, when expiry
    /// is enforced).
    AuthenticatedUndecodable,
    AuthenticatedProfileIncomplete(DecodedClaims),
    AuthenticatedProfileComplete(DecodedClaims),
    /// Any role other than company administrator, including admin roles.
    AuthenticatedOtherRole(DecodedClaims),
}

impl GuardState {
    pub fn name(&self) -> &'static str {
        match self {
            GuardState::Anonymous => "anonymous",
            GuardState::AuthenticatedUndecodable => "undecodable",
            GuardState::AuthenticatedProfileIncomplete(_) => "profile_incomplete",
            GuardState::AuthenticatedProfileComplete(_) => "profile_complete",
            GuardState::AuthenticatedOtherRole(_) => "other_role",
        }
    }

    pub fn claims(&self) -> Option<&DecodedClaims> {
        match self {
            GuardState::AuthenticatedProfileIncomplete(c)
            | GuardState::AuthenticatedProfileComplete(c)
            | GuardState::AuthenticatedOtherRole(c) => Some(c),
            GuardState::Anonymous | GuardState::AuthenticatedUndecodable => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    Redirect {
        location: String,
        /// Drop the session cookies on the way out.
        clear_session: bool,
    },
}

#[derive(Debug, Clone)]
pub struct GuardPolicy {
    pub login_path: String,
    pub profile_completion_path: String,
    pub protected: ProtectedPaths,
    /// Requests matching these are never intercepted (assets, API calls).
    pub skip: RegexSet,
    /// Company-owned paths admin roles get sent away from. Role areas such as
    /// `/training-admin/...` never count, even when a pattern matches them.
    pub company_scoped: RegexSet,
    /// Treat expired tokens as undecodable.
    pub enforce_expiry: bool,
}

impl GuardPolicy {
    pub fn intercepts(&self, path: &str) -> bool {
        !self.skip.is_match(path)
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected.is_protected(path)
    }

    fn is_company_scoped(&self, path: &str) -> bool {
        let path = normalize(path);
        self.company_scoped.is_match(path) && !is_role_area(path)
    }

    fn is_profile_completion(&self, path: &str) -> bool {
        normalize(path) == normalize(&self.profile_completion_path)
    }

    pub fn classify(&self, token: Option<&str>, now: i64) -> GuardState {
        let Some(token) = token else {
            return GuardState::Anonymous;
        };

        let claims = match token::decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Session token rejected: {}", e);
                return GuardState::AuthenticatedUndecodable;
            }
        };

        if self.enforce_expiry && claims.is_expired(now) {
            tracing::debug!("Session token expired at {}", claims.expires_at);
            return GuardState::AuthenticatedUndecodable;
        }

        match claims.role {
            RoleClaims::CompanyAdmin { .. } if claims.is_profile_filled => {
                GuardState::AuthenticatedProfileComplete(claims)
            }
            RoleClaims::CompanyAdmin { .. } => GuardState::AuthenticatedProfileIncomplete(claims),
            _ => GuardState::AuthenticatedOtherRole(claims),
        }
    }

    /// Apply the routing rules to a classified request.
    pub fn decide(&self, state: &GuardState, path: &str, query: Option<&str>) -> GuardDecision {
        let target = match state {
            GuardState::Anonymous | GuardState::AuthenticatedUndecodable => {
                if !self.is_protected(path) {
                    return GuardDecision::Pass;
                }
                return GuardDecision::Redirect {
                    location: self.login_redirect(path, query),
                    clear_session: matches!(state, GuardState::AuthenticatedUndecodable),
                };
            }
            GuardState::AuthenticatedOtherRole(claims) => match &claims.role {
                RoleClaims::Admin(role)
                    if normalize(path) == ROOT_ROUTE || self.is_company_scoped(path) =>
                {
                    Some(map_role_to_route(*role, None))
                }
                _ => None,
            },
            GuardState::AuthenticatedProfileIncomplete(_) => {
                if self.is_profile_completion(path) {
                    None
                } else {
                    Some(self.profile_completion_path.clone())
                }
            }
            GuardState::AuthenticatedProfileComplete(claims) => {
                if self.is_profile_completion(path) || normalize(path) == ROOT_ROUTE {
                    Some(map_role_to_route(
                        Role::CompanyAdmin,
                        claims.company_profile_id(),
                    ))
                } else {
                    None
                }
            }
        };

        match target {
            // Never bounce a request back onto itself.
            Some(location) if normalize(&location) != normalize(path) => GuardDecision::Redirect {
                location,
                clear_session: false,
            },
            _ => GuardDecision::Pass,
        }
    }

    pub fn evaluate(
        &self,
        path: &str,
        query: Option<&str>,
        token: Option<&str>,
        now: i64,
    ) -> (GuardState, GuardDecision) {
        let state = self.classify(token, now);
        let decision = self.decide(&state, path, query);
        (state, decision)
    }

    /// Login URL carrying the original path and query in `redirect`.
    pub fn login_redirect(&self, path: &str, query: Option<&str>) -> String {
        let original = match query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{}?{}", path, q),
            None => path.to_string(),
        };
        format!(
            "{}?redirect={}",
            self.login_path,
            urlencoding::encode(&original)
        )
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn skip_set() -> RegexSet {
        RegexSet::new([r"^/api/", r"^/assets/", r"^/favicon\.ico$"]).unwrap()
    }

    pub fn company_scoped_set() -> RegexSet {
        RegexSet::new([
            r"^/(complete-profile|company-profile)(/.*)?$",
            r"^/[^/]+/(dashboard|trainings|employees|settings)(/.*)?$",
        ])
        .unwrap()
    }

    pub fn portal_policy() -> GuardPolicy {
        GuardPolicy {
            login_path: "/login".to_string(),
            profile_completion_path: "/complete-profile".to_string(),
            protected: ProtectedPaths::AllExcept(vec![
                "/".to_string(),
                "/login".to_string(),
                "/register".to_string(),
            ]),
            skip: skip_set(),
            company_scoped: company_scoped_set(),
            enforce_expiry: false,
        }
    }

    pub fn console_policy() -> GuardPolicy {
        GuardPolicy {
            protected: ProtectedPaths::Patterns(
                RegexSet::new([
                    r"^/(super-admin|training-admin)(/.*)?$",
                    r"^/[^/]+/(dashboard|trainings)(/.*)?$",
                ])
                .unwrap(),
            ),
            ..portal_policy()
        }
    }
}
