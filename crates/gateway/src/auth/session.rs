//! Cookie-backed session store.
//!
//! A `SessionStore` lives for one request. It starts from the cookies the browser
//! sent, records whatever the handler changes, and writes those changes back as
//! `Set-Cookie` headers on the response.

use axum::http::{header, HeaderMap, HeaderValue};
use cookie::time::{Duration, OffsetDateTime};
use cookie::{Cookie, CookieJar, SameSite};
use shared_types::{
    CompanyInfo, COMPANY_INFO_COOKIE, PROFILE_PICTURE_COOKIE, ROLE_COOKIE, SESSION_COOKIES,
    TOKEN_COOKIE,
};

use super::types::{Role, Session};

/// Sessions last one day from sign-in.
pub const SESSION_MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// Cookie attributes fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieSettings {
    /// Set in production only.
    pub secure: bool,
    /// Whether page scripts may read the session cookies.
    pub http_only: bool,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    jar: CookieJar,
    settings: CookieSettings,
}

impl SessionStore {
    pub fn new(settings: CookieSettings) -> Self {
        Self {
            jar: CookieJar::new(),
            settings,
        }
    }

    /// Load the cookies of an incoming request.
    pub fn from_headers(headers: &HeaderMap, settings: CookieSettings) -> Self {
        let mut jar = CookieJar::new();

        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse(value).flatten() {
                jar.add_original(cookie.into_owned());
            }
        }

        Self { jar, settings }
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.jar
            .get(name)
            .map(|c| c.value())
            .filter(|v| !v.is_empty())
    }

    pub fn token(&self) -> Option<&str> {
        self.value(TOKEN_COOKIE)
    }

    /// Role mirrored from the token for fast reads. Unknown strings read as absent.
    pub fn role(&self) -> Option<Role> {
        self.value(ROLE_COOKIE)?.parse().ok()
    }

    pub fn company_info(&self) -> Option<CompanyInfo> {
        let raw = urlencoding::decode(self.value(COMPANY_INFO_COOKIE)?).ok()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn profile_picture(&self) -> Option<String> {
        let raw = self.value(PROFILE_PICTURE_COOKIE)?;
        urlencoding::decode(raw).ok().map(|v| v.into_owned())
    }

    /// Write the token cookie, plus the role cookie when the session has a role.
    pub fn set_session(&mut self, session: &Session, max_age_secs: i64) {
        self.put(TOKEN_COOKIE, session.token.clone(), max_age_secs);
        if let Some(role) = session.role {
            self.put(ROLE_COOKIE, role.as_str().to_string(), max_age_secs);
        }
    }

    pub fn set_company_info(&mut self, company_profile_id: &str, max_age_secs: i64) {
        let info = CompanyInfo {
            id: company_profile_id.to_string(),
        };
        match serde_json::to_string(&info) {
            Ok(json) => self.put(
                COMPANY_INFO_COOKIE,
                urlencoding::encode(&json).into_owned(),
                max_age_secs,
            ),
            Err(e) => tracing::warn!("Failed to serialize company info: {}", e),
        }
    }

    pub fn set_profile_picture(&mut self, url: &str, max_age_secs: i64) {
        let cookie = Cookie::build((
            PROFILE_PICTURE_COOKIE,
            urlencoding::encode(url).into_owned(),
        ))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(self.settings.secure)
        .http_only(false)
        .max_age(Duration::seconds(max_age_secs))
        .build();
        self.jar.add(cookie);
    }

    /// Expire every session cookie, whether or not the browser sent it.
    pub fn clear_session(&mut self) {
        for name in SESSION_COOKIES {
            let cookie = self
                .base(name, String::new())
                .max_age(Duration::ZERO)
                .expires(OffsetDateTime::UNIX_EPOCH)
                .build();
            self.jar.add(cookie);
        }
    }

    /// Changes made since the store was loaded.
    pub fn pending(&self) -> impl Iterator<Item = &Cookie<'static>> {
        self.jar.delta()
    }

    /// Append one `Set-Cookie` header per pending change.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for cookie in self.pending() {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                }
                Err(e) => tracing::error!("Dropping unencodable cookie {}: {}", cookie.name(), e),
            }
        }
    }

    fn base(&self, name: &'static str, value: String) -> cookie::CookieBuilder<'static> {
        Cookie::build((name, value))
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.settings.secure)
            .http_only(self.settings.http_only)
    }

    fn put(&mut self, name: &'static str, value: String, max_age_secs: i64) {
        let cookie = self
            .base(name, value)
            .max_age(Duration::seconds(max_age_secs))
            .build();
        self.jar.add(cookie);
    }
}
