//! Default landing routes per role.

use super::types::{DecodedClaims, Role};

/// Neutral route for users we cannot place anywhere more specific.
pub const ROOT_ROUTE: &str = "/";

/// Whether a company profile id can be used as a single path segment.
///
/// The id comes from an unverified token, so anything beyond ASCII letters,
/// digits, `-` and `_` is refused rather than escaped.
pub fn is_safe_segment(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Map a role to its dashboard.
///
/// Company administrators land on their company's dashboard and need the profile
/// id for it; without a usable one they get the root route. Every other role
/// ignores the id.
pub fn map_role_to_route(role: Role, company_profile_id: Option<&str>) -> String {
    match role {
        Role::SuperAdmin => "/super-admin/dashboard".to_string(),
        Role::TrainingAdmin => "/training-admin/dashboard".to_string(),
        Role::Trainer => "/trainer/dashboard".to_string(),
        Role::Trainee => "/trainee/dashboard".to_string(),
        Role::CompanyAdmin => match company_profile_id.map(str::trim) {
            Some(id) if is_safe_segment(id) => format!("/{}/dashboard", id),
            Some(id) if !id.is_empty() => {
                tracing::debug!("Ignoring company profile id that is not a path segment");
                ROOT_ROUTE.to_string()
            }
            _ => ROOT_ROUTE.to_string(),
        },
    }
}

/// Where to send a user right after signing in.
pub fn landing_route(
    role: Option<Role>,
    company_profile_id: Option<&str>,
    is_profile_filled: bool,
    profile_completion_path: &str,
) -> String {
    match role {
        Some(Role::CompanyAdmin) if !is_profile_filled => profile_completion_path.to_string(),
        Some(role) => map_role_to_route(role, company_profile_id),
        None => ROOT_ROUTE.to_string(),
    }
}

pub fn landing_route_for(claims: &DecodedClaims, profile_completion_path: &str) -> String {
    landing_route(
        claims.role(),
        claims.company_profile_id(),
        claims.is_profile_filled,
        profile_completion_path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_dashboards() {
        assert_eq!(
            map_role_to_route(Role::SuperAdmin, None),
            "/super-admin/dashboard"
        );
        assert_eq!(
            map_role_to_route(Role::TrainingAdmin, None),
            "/training-admin/dashboard"
        );
        assert_eq!(map_role_to_route(Role::Trainer, None), "/trainer/dashboard");
        assert_eq!(map_role_to_route(Role::Trainee, None), "/trainee/dashboard");
    }

    #[test]
    fn test_admin_roles_ignore_company_id() {
        for role in Role::ALL.into_iter().filter(Role::is_admin) {
            assert_eq!(
                map_role_to_route(role, Some("abc-123")),
                map_role_to_route(role, None)
            );
        }
    }

    #[test]
    fn test_company_admin_dashboard() {
        assert_eq!(
            map_role_to_route(Role::CompanyAdmin, Some("abc-123")),
            "/abc-123/dashboard"
        );
    }

    #[test]
    fn test_company_admin_without_id_falls_back_to_root() {
        assert_eq!(map_role_to_route(Role::CompanyAdmin, None), "/");
        assert_eq!(map_role_to_route(Role::CompanyAdmin, Some("")), "/");
    }

    #[test]
    fn test_unsafe_company_id_falls_back_to_root() {
        for id in [
            "/evil.example",
            "\\evil.example",
            "a\u{1}b",
            "abc/../admin",
            "abc?x=1",
            "abc def",
            "..",
        ] {
            assert_eq!(map_role_to_route(Role::CompanyAdmin, Some(id)), "/", "{:?}", id);
        }
        assert_eq!(
            landing_route(Some(Role::CompanyAdmin), Some("/evil.example"), true, "/complete-profile"),
            "/"
        );
    }

    #[test]
    fn test_safe_segment_accepts_uuid_and_slug() {
        assert!(is_safe_segment("3f2b8c1e-9d4a-4b7e-8f00-1a2b3c4d5e6f"));
        assert!(is_safe_segment("acme_training"));
        assert!(!is_safe_segment(""));
        assert!(!is_safe_segment(&"a".repeat(129)));
    }

    #[test]
    fn test_landing_route_sends_incomplete_company_to_profile() {
        assert_eq!(
            landing_route(
                Some(Role::CompanyAdmin),
                Some("abc-123"),
                false,
                "/complete-profile"
            ),
            "/complete-profile"
        );
        assert_eq!(
            landing_route(
                Some(Role::CompanyAdmin),
                Some("abc-123"),
                true,
                "/complete-profile"
            ),
            "/abc-123/dashboard"
        );
        assert_eq!(
            landing_route(Some(Role::Trainee), None, false, "/complete-profile"),
            "/trainee/dashboard"
        );
        assert_eq!(landing_route(None, None, true, "/complete-profile"), "/");
    }
}
