//! JWT signing and verification.
//!
//! Tokens are HS256 over the shared secret. Claims are an open map so that
//! whatever the issuing service put in the token reaches downstream handlers
//! unchanged.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::auth::Identity;

/// Signs and verifies access tokens.
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtCodec {
    /// Create a new codec with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign `claims` with `iat` set to now and `exp` set to now + `ttl`.
    /// Existing `iat`/`exp` claims are overwritten.
    pub fn sign(&self, claims: &Identity, ttl: Duration) -> Result<String, JwtError> {
        let now = unix_now()?;
        let mut claims = claims.clone();
        claims.insert("iat", now);
        claims.insert("exp", now + ttl.as_secs());
        self.sign_raw(&claims)
    }

    /// Sign `claims` exactly as given.
    pub fn sign_raw(&self, claims: &Identity) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::default(), claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    /// Verify a token's signature and expiry and return its claims.
    ///
    /// `exp` is optional: a token without it never expires. A future `nbf`
    /// is rejected as immature. There is no leeway.
    pub fn verify(&self, token: &str) -> Result<Identity, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.required_spec_claims.clear();

        let token_data = jsonwebtoken::decode::<Identity>(token, &self.decoding_key, &validation)
            .map_err(JwtError::Decoding)?;

        Ok(token_data.claims)
    }
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Seconds left until the `exp` claim, if the claims carry one.
pub fn remaining_lifetime(claims: &Identity) -> Option<Duration> {
    let exp = claims.get("exp").and_then(Value::as_u64)?;
    let now = unix_now().ok()?;
    Some(Duration::from_secs(exp.saturating_sub(now)))
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("Failed to decode token: {0}")]
    Decoding(jsonwebtoken::errors::Error),
    #[error("System time error")]
    TimeError,
}
