//! Access-token verification and the authenticated-caller extractor.
//!
//! Tokens are compact HS256 JWTs issued elsewhere. Verification checks the
//! algorithm, the signature and the numeric `exp` claim, then yields an
//! [`Identity`]. Token issuance is not handled here.

use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::app_state::AppState;
use crate::domain::{Identity, UserId};
use crate::error::PlatformError;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a bearer token is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer` header.
    #[error("missing bearer token")]
    Missing,

    /// Not a decodable HS256 JWT, or required claims are absent.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Signature does not match the shared secret.
    #[error("invalid token signature")]
    BadSignature,

    /// `exp` is in the past.
    #[error("token expired")]
    Expired,
}

impl From<AuthError> for PlatformError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

#[derive(Deserialize)]
struct Claims {
    #[serde(alias = "userID", alias = "userId")]
    user_id: i64,
    username: String,
    exp: i64,
}

/// Verifies HS256 access tokens against a shared secret.
#[derive(Clone)]
pub struct IdentityVerifier {
    secret: Vec<u8>,
}

impl fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl IdentityVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: secret.to_vec(),
        }
    }

    /// Verifies `token` and returns the caller identity it carries.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] describing why the token was rejected.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let Some((signing_input, signature)) = token.rsplit_once('.') else {
            return Err(AuthError::Malformed("expected three segments".to_string()));
        };
        let Some((header, payload)) = signing_input.split_once('.') else {
            return Err(AuthError::Malformed("expected three segments".to_string()));
        };
        if payload.contains('.') {
            return Err(AuthError::Malformed("expected three segments".to_string()));
        }

        let header: Header = decode_segment(header)?;
        if header.alg != "HS256" {
            return Err(AuthError::Malformed(format!(
                "unsupported algorithm {}",
                header.alg
            )));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        let claims: Claims = decode_segment(payload)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        let identity = Identity::new(UserId::new(claims.user_id), claims.username);
        if !identity.is_well_formed() {
            return Err(AuthError::Malformed(
                "user id or username missing".to_string(),
            ));
        }
        Ok(identity)
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::Malformed(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::Malformed(e.to_string()))
}

/// Extractor for handlers that require a verified caller.
///
/// Rejects with `401` and error code `1001` when the header is missing or
/// the token fails verification.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = PlatformError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::Missing)?;

        let identity = state
            .identity
            .verify(token)
            .inspect_err(|e| tracing::debug!(error = %e, "rejected bearer token"))?;
        Ok(Self(identity))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SECRET: &[u8] = b"test-secret";

    /// Signs `claims` as an HS256 token.
    pub(crate) fn sign(secret: &[u8], claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        let signing_input = format!("{header}.{payload}");
        #[allow(clippy::expect_used)]
        let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{signing_input}.{signature}")
    }

    pub(crate) fn token_for(user_id: i64, username: &str) -> String {
        let exp = Utc::now().timestamp() + 3_600;
        sign(
            SECRET,
            &serde_json::json!({"userID": user_id, "username": username, "exp": exp}),
        )
    }

    #[test]
    fn accepts_valid_token() {
        let verifier = IdentityVerifier::new(SECRET);
        assert_eq!(
            verifier.verify(&token_for(7, "bob")),
            Ok(Identity::new(UserId::new(7), "bob"))
        );
    }

    #[test]
    fn accepts_snake_case_user_id() {
        let exp = Utc::now().timestamp() + 60;
        let token = sign(
            SECRET,
            &serde_json::json!({"user_id": 3, "username": "carol", "exp": exp}),
        );
        let verifier = IdentityVerifier::new(SECRET);
        assert_eq!(
            verifier.verify(&token).map(|i| i.user_id),
            Ok(UserId::new(3))
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let verifier = IdentityVerifier::new(b"other-secret");
        assert_eq!(
            verifier.verify(&token_for(7, "bob")),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn rejects_expired_token() {
        let exp = Utc::now().timestamp() - 10;
        let token = sign(
            SECRET,
            &serde_json::json!({"userID": 7, "username": "bob", "exp": exp}),
        );
        assert_eq!(
            IdentityVerifier::new(SECRET).verify(&token),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn rejects_missing_exp() {
        let token = sign(SECRET, &serde_json::json!({"userID": 7, "username": "bob"}));
        assert!(matches!(
            IdentityVerifier::new(SECRET).verify(&token),
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_blank_username() {
        let exp = Utc::now().timestamp() + 60;
        let token = sign(
            SECRET,
            &serde_json::json!({"userID": 7, "username": " ", "exp": exp}),
        );
        assert!(matches!(
            IdentityVerifier::new(SECRET).verify(&token),
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        let verifier = IdentityVerifier::new(SECRET);
        assert!(matches!(verifier.verify("abc"), Err(AuthError::Malformed(_))));
        assert!(matches!(
            verifier.verify("a.b.c.d"),
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let token = token_for(7, "bob");
        let Some((header, rest)) = token.split_once('.') else {
            panic!("token has no header");
        };
        let Some((_, signature)) = rest.split_once('.') else {
            panic!("token has no signature");
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({"userID": 1, "username": "alice", "exp": i64::MAX}).to_string(),
        );
        let forged = format!("{header}.{forged_payload}.{signature}");
        assert_eq!(
            IdentityVerifier::new(SECRET).verify(&forged),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", IdentityVerifier::new(SECRET));
        assert!(!rendered.contains("test-secret"));
    }
}
