//! Compact token decoding.
//!
//! Tokens are `header.payload.signature`. Only the payload is read; the signature is
//! never checked, so the result is good for routing decisions and nothing else.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

use super::types::{DecodedClaims, Role, RoleClaims};

/// Anything longer than this is not a token we issued.
const MAX_TOKEN_LEN: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed token: {0}")]
    Malformed(&'static str),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Subject {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClaims {
    sub: Subject,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    is_profile_filled: Option<bool>,
    #[serde(default)]
    company_profile_id: Option<String>,
    exp: i64,
}

/// Decode the payload segment of a compact token.
pub fn decode(token: &str) -> Result<DecodedClaims, DecodeError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(DecodeError::Malformed("token too long"));
    }

    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() < 2 {
        return Err(DecodeError::Malformed("missing payload segment"));
    }
    if segments.len() != 3 {
        return Err(DecodeError::Malformed("expected three segments"));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|_| DecodeError::Malformed("payload is not base64url"))?;

    let raw: RawClaims = serde_json::from_slice(&payload)
        .map_err(|_| DecodeError::Malformed("payload is not a claims object"))?;

    let role = match raw.role.as_deref() {
        Some(value) => match value.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::debug!("Ignoring role claim: {}", e);
                None
            }
        },
        None => None,
    };

    Ok(DecodedClaims {
        subject_id: match raw.sub {
            Subject::Text(s) => s,
            Subject::Number(n) => n.to_string(),
        },
        email: raw.email.unwrap_or_default(),
        is_profile_filled: raw.is_profile_filled.unwrap_or(false),
        expires_at: raw.exp,
        role: RoleClaims::from_role(role, raw.company_profile_id),
    })
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::Value;

    /// Sign a payload the way the backend does. The gateway never checks the key.
    pub fn mint(payload: Value) -> String {
        encode(
            &Header::default(),
            &payload,
            &EncodingKey::from_secret(b"backend-only-secret"),
        )
        .expect("should encode token")
    }
}

#[cfg(test)]
mod tests {
    use super::test_tokens::mint;
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_decode_company_admin() {
        let token = mint(json!({
            "sub": "user-1",
            "email": "owner@acme.test",
            "role": "ROLE_COMPANY_ADMIN",
            "isProfileFilled": true,
            "companyProfileId": "abc-123",
            "iat": 1_700_000_000,
            "exp": 1_700_086_400
        }));

        let claims = decode(&token).expect("should decode");
        assert_eq!(claims.subject_id, "user-1");
        assert_eq!(claims.email, "owner@acme.test");
        assert!(claims.is_profile_filled);
        assert_eq!(claims.role(), Some(Role::CompanyAdmin));
        assert_eq!(claims.company_profile_id(), Some("abc-123"));
        assert_eq!(claims.expires_at, 1_700_086_400);
    }

    #[test]
    fn test_decode_ignores_signature_and_unknown_fields() {
        let token = mint(json!({
            "sub": 42,
            "role": "ROLE_TRAINING_ADMIN",
            "exp": 1_700_000_000,
            "permissions": ["a", "b"]
        }));
        let (head, _) = token.rsplit_once('.').unwrap();
        let forged = format!("{}.not-a-real-signature", head);

        let claims = decode(&forged).expect("signature is not checked");
        assert_eq!(claims.subject_id, "42");
        assert_eq!(claims.role, RoleClaims::Admin(Role::TrainingAdmin));
        assert!(!claims.is_profile_filled);
    }

    #[test]
    fn test_unknown_role_decodes_as_unassigned() {
        let token = mint(json!({"sub": "u", "role": "ROLE_JANITOR", "exp": 1}));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.role, RoleClaims::Unassigned);
    }

    #[test]
    fn test_padded_payload_accepted() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(br#"{"sub":"u","exp":10}"#);
        let token = format!("e30.{}.sig", payload);
        assert_eq!(decode(&token).unwrap().expires_at, 10);
    }

    #[test]
    fn test_malformed_inputs() {
        assert_eq!(
            decode("abc"),
            Err(DecodeError::Malformed("missing payload segment"))
        );
        assert_eq!(
            decode(""),
            Err(DecodeError::Malformed("missing payload segment"))
        );
        assert!(decode("a.b").is_err());
        assert!(decode("a.b.c.d").is_err());
        assert_eq!(
            decode("a.!!!.c"),
            Err(DecodeError::Malformed("payload is not base64url"))
        );

        let not_json = URL_SAFE_NO_PAD.encode(b"not json");
        assert!(decode(&format!("a.{}.c", not_json)).is_err());

        let array = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        assert!(decode(&format!("a.{}.c", array)).is_err());

        let no_exp = URL_SAFE_NO_PAD.encode(br#"{"sub":"u"}"#);
        assert!(decode(&format!("a.{}.c", no_exp)).is_err());
    }

    #[test]
    fn test_oversized_token_rejected() {
        let huge = "a.".repeat(MAX_TOKEN_LEN);
        assert_eq!(decode(&huge), Err(DecodeError::Malformed("token too long")));
    }

    #[test]
    fn test_expiry_comparison() {
        let token = mint(json!({"sub": "u", "exp": 100}));
        let claims = decode(&token).unwrap();
        assert!(!claims.is_expired(99));
        assert!(claims.is_expired(100));
    }

    proptest! {
        #[test]
        fn decode_never_panics(input in ".*") {
            let _ = decode(&input);
        }

        #[test]
        fn non_three_segment_strings_fail(input in "[A-Za-z0-9_=-]{0,64}(\\.[A-Za-z0-9_=-]{0,64})?") {
            prop_assert!(decode(&input).is_err());
        }

        #[test]
        fn random_segments_never_panic(
            a in "[A-Za-z0-9_-]{0,32}",
            b in "[A-Za-z0-9_=-]{0,128}",
            c in "[A-Za-z0-9_-]{0,32}",
        ) {
            let _ = decode(&format!("{}.{}.{}", a, b, c));
        }
    }
}
