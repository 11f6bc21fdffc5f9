//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::collaborator::CollaboratorError;

/// Failure modes of credential resolution.
///
/// Only `CredentialExpiredNoFallback` stops a request. The others are
/// absorbed: the caller continues as anonymous (or, for a service call,
/// with an empty identity).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("access token expired and was not renewed (refresh attempted: {refresh_attempted})")]
    CredentialExpiredNoFallback { refresh_attempted: bool },
    #[error("collaborator failure: {0}")]
    CollaboratorFailure(#[from] CollaboratorError),
    #[error("malformed credential")]
    MalformedCredential,
    #[error("token verification failed: {0}")]
    VerificationFailure(String),
    #[error("malformed service identity: {0}")]
    DeserializationFailure(String),
}

impl AuthError {
    /// Whether this error must surface to the client.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CredentialExpiredNoFallback { .. })
    }
}

/// Why a request was refused at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    NotAuthenticated,
    CredentialExpired,
    InsufficientRole,
}

/// API authentication error (returns JSON).
///
/// Cookie cleanup is not done here; the session mutator owns every
/// Set-Cookie header this layer emits.
#[derive(Debug)]
pub struct ApiAuthError {
    pub kind: AuthErrorKind,
}

impl ApiAuthError {
    pub fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::NotAuthenticated | AuthErrorKind::CredentialExpired => {
                StatusCode::UNAUTHORIZED
            }
            AuthErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Not authenticated",
            AuthErrorKind::CredentialExpired => "Session expired",
            AuthErrorKind::InsufficientRole => "Insufficient permissions",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
