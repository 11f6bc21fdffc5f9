//! External services that renew sessions.
//!
//! The resolver calls at most one of these per request and never retries.
//! Timeouts are applied by the resolver around every call.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

/// Request metadata forwarded to collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// A freshly issued access credential.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssuedCredential {
    pub access_token: String,
}

/// Errors a collaborator can report. All of them are soft from the
/// resolver's point of view except on the expired-token refresh path.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("credential rejected: {0}")]
    Rejected(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("no collaborator configured")]
    NotConfigured,
}

/// Exchanges long-lived credentials for new access tokens.
#[async_trait]
pub trait SessionCollaborator: Send + Sync {
    /// Exchange a refresh token for a new access token.
    async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientContext,
    ) -> Result<IssuedCredential, CollaboratorError>;

    /// Log in with an opaque API key.
    async fn login_with_api_key(
        &self,
        api_key: &str,
        client: &ClientContext,
    ) -> Result<IssuedCredential, CollaboratorError>;
}

/// Collaborator for deployments without a refresh or API-key service.
/// Every call fails, so expired tokens are rejected and malformed ones cleared.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCollaborator;

#[async_trait]
impl SessionCollaborator for NoCollaborator {
    async fn refresh(
        &self,
        _refresh_token: &str,
        _client: &ClientContext,
    ) -> Result<IssuedCredential, CollaboratorError> {
        Err(CollaboratorError::NotConfigured)
    }

    async fn login_with_api_key(
        &self,
        _api_key: &str,
        _client: &ClientContext,
    ) -> Result<IssuedCredential, CollaboratorError> {
        Err(CollaboratorError::NotConfigured)
    }
}
