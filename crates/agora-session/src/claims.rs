//! Access-token claims: what the client reads out of the JWT.
//!
//! The client is not the verifier — signatures are checked server-side on
//! every request. Here the token is only *inspected*: who is this, what
//! role, and above all, when does it expire. Decoding therefore runs with
//! signature validation disabled and expiry validation off; expiry is a
//! lifecycle decision for the [`SessionManager`](crate::SessionManager),
//! not a decode failure.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::SessionError;

/// Claims payload embedded in every access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the user id.
    pub sub: String,
    /// User role at the time of issuance ("Customer", "Admin", ...).
    #[serde(default)]
    pub role: String,
    /// Fine-grained permission strings.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Issued-at timestamp (seconds since epoch).
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Whether this token has already expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Whether this token expires within the given window from now.
    /// Already-expired tokens count as "within" any window.
    pub fn expires_within(&self, window: Duration) -> bool {
        let horizon = Utc::now().timestamp() + window.as_secs() as i64;
        self.exp <= horizon
    }

    /// Remaining lifetime in seconds (0 if expired).
    pub fn remaining_ttl_seconds(&self) -> u64 {
        let remaining = self.exp - Utc::now().timestamp();
        if remaining > 0 { remaining as u64 } else { 0 }
    }
}

/// Extracts the claims from a raw token without verifying the signature.
///
/// # Errors
/// Returns [`SessionError::InvalidToken`] for anything that is not a JWT
/// carrying the expected claims — never panics, never distinguishes the
/// flavors of malformed.
pub fn decode_claims(token: &str) -> Result<Claims, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data =
        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token decode failed");
                SessionError::InvalidToken
            })?;
    Ok(data.claims)
}
