//! Classifies token verification into a closed set of outcomes.

use jsonwebtoken::errors::ErrorKind;

use super::claims::Identity;
use crate::jwt::{JwtCodec, JwtError};

/// Result of verifying an access token.
#[derive(Debug)]
pub enum VerificationOutcome {
    Valid(Identity),
    /// Signature checks out but `exp` has passed.
    Expired,
    /// Not a token signed with our secret: bad structure, encoding or signature.
    Malformed,
    /// Verifiable but unusable, e.g. not valid before a future `nbf`.
    Other(JwtError),
}

/// Verify `token` and classify the failure, if any.
pub fn verify(codec: &JwtCodec, token: &str) -> VerificationOutcome {
    match codec.verify(token) {
        Ok(identity) => VerificationOutcome::Valid(identity),
        Err(JwtError::Decoding(e)) => match e.kind() {
            ErrorKind::ExpiredSignature => VerificationOutcome::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => VerificationOutcome::Malformed,
            _ => VerificationOutcome::Other(JwtError::Decoding(e)),
        },
        Err(e) => VerificationOutcome::Other(e),
    }
}
