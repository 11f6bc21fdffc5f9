//! Axum extractors and guards over the resolved identity.
//!
//! These read what `authenticate` attached; they never resolve credentials
//! themselves.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::claims::Identity;
use super::errors::{ApiAuthError, AuthErrorKind};
use super::session::{SessionMutation, SessionMutator};
use super::state::Authenticator;

/// Extractor for endpoints that require an identity.
pub struct Auth(pub Identity);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Auth)
            .ok_or(ApiAuthError::new(AuthErrorKind::NotAuthenticated))
    }
}

/// Optional identity - never fails.
pub struct MaybeAuth(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(parts.extensions.get::<Identity>().cloned()))
    }
}

/// Role requirement for a group of routes.
#[derive(Clone)]
pub struct RoleGuard {
    roles: Arc<[String]>,
    mutator: SessionMutator,
}

impl RoleGuard {
    /// An empty role list admits any identified caller.
    pub fn new(roles: &[&str], mutator: SessionMutator) -> Self {
        Self {
            roles: roles.iter().map(|r| r.to_string()).collect(),
            mutator,
        }
    }

    pub fn permits(&self, identity: &Identity) -> bool {
        self.roles.is_empty() || identity.is_superuser() || identity.has_any_role(&self.roles[..])
    }
}

impl Authenticator {
    /// Guard requiring any of `roles`. Use with `enforce_roles`.
    pub fn require_roles(&self, roles: &[&str]) -> RoleGuard {
        RoleGuard::new(roles, self.mutator().clone())
    }
}

/// Middleware applying a `RoleGuard`.
///
/// No identity: 401 and the session cookies are cleared. Identity without a
/// matching role: 403.
pub async fn enforce_roles(
    State(guard): State<RoleGuard>,
    request: Request,
    next: Next,
) -> Response {
    match request.extensions().get::<Identity>() {
        None => {
            let mut response = ApiAuthError::new(AuthErrorKind::NotAuthenticated).into_response();
            guard
                .mutator
                .write(&SessionMutation::Clear, response.headers_mut());
            response
        }
        Some(identity) if guard.permits(identity) => next.run(request).await,
        Some(_) => ApiAuthError::new(AuthErrorKind::InsufficientRole).into_response(),
    }
}
