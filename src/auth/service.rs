//! Trusted service-to-service identity.
//!
//! A caller presenting the service key is infrastructure. Its identity comes
//! from a JSON header and is taken as-is, without token verification.

use subtle::ConstantTimeEq;

use super::claims::Identity;
use super::errors::AuthError;
use crate::config::AuthConfig;

/// Constant-time check of a presented service key.
pub fn is_trusted_service(presented: &str, config: &AuthConfig) -> bool {
    let expected = config.service_key_bytes();
    if expected.is_empty() {
        return false;
    }
    presented.as_bytes().ct_eq(expected).into()
}

/// Parse a serialized identity header. Only JSON objects are accepted.
pub fn parse_service_identity(raw: &str) -> Result<Identity, AuthError> {
    serde_json::from_str::<Identity>(raw)
        .map_err(|e| AuthError::DeserializationFailure(e.to_string()))
}

/// Deserialize the identity a trusted service supplied.
///
/// A missing header or one that is not a JSON object yields the empty
/// identity. This path never fails the request.
pub fn service_identity(identity_header: Option<&str>) -> Identity {
    let Some(raw) = identity_header else {
        return Identity::new();
    };
    parse_service_identity(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Discarding malformed service identity header");
        Identity::new()
    })
}
