//! Local inspection of JWT access tokens
//!
//! The client never holds the signing key, so claims are decoded without
//! signature validation. The result is informational (expiry display,
//! logging); only the verify endpoint decides whether a token is valid.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Claims the storefront backend puts in its tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Expiration time
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued at time
    #[serde(default)]
    pub iat: Option<i64>,
    /// Token type ("access" or "refresh")
    #[serde(default)]
    pub token_type: Option<String>,
    /// Subject the token was issued for
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
}

impl Claims {
    /// Expiration as a timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Whether the token is past its expiration at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

fn insecure_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![
        Algorithm::HS256,
        Algorithm::HS384,
        Algorithm::HS512,
        Algorithm::RS256,
        Algorithm::RS384,
        Algorithm::RS512,
        Algorithm::ES256,
        Algorithm::ES384,
    ];
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation
}

/// Decode the claims of `token` without checking its signature
///
/// Returns `None` for opaque (non-JWT) tokens.
pub fn peek_claims(token: &str) -> Option<Claims> {
    match decode::<Claims>(token, &DecodingKey::from_secret(&[]), &insecure_validation()) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!("Token is not a decodable JWT: {}", e);
            None
        }
    }
}

/// Expiration of `token`, when it is a JWT carrying an `exp` claim
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    peek_claims(token).and_then(|claims| claims.expires_at())
}
