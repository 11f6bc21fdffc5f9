//! HTTP-backed session collaborator.
//!
//! Talks to an account service exposing:
//! - `POST {refresh_url}` with `{"refreshToken", "ip", "agent"}`
//! - `GET {api_key_url}/{key}`
//!
//! Both answer `{"success": true, "data": {"access_token": "..."}}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::collaborator::{ClientContext, CollaboratorError, IssuedCredential, SessionCollaborator};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<&'a str>,
}

/// Response envelope shared by both endpoints.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    data: Option<IssuedCredential>,
}

/// Collaborator calling a remote account service.
pub struct HttpSessionCollaborator {
    client: reqwest::Client,
    refresh_url: Url,
    api_key_url: Url,
    timeout: Duration,
}

impl HttpSessionCollaborator {
    /// Create a collaborator. `timeout` bounds each HTTP exchange.
    pub fn new(
        refresh_url: Url,
        api_key_url: Url,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Transport(format!("failed to build client: {e}")))?;

        Ok(Self {
            client,
            refresh_url,
            api_key_url,
            timeout,
        })
    }

    fn api_key_url(&self, api_key: &str) -> Result<Url, CollaboratorError> {
        let mut url = self.api_key_url.clone();
        url.path_segments_mut()
            .map_err(|_| CollaboratorError::InvalidResponse("API key URL cannot be a base".into()))?
            .pop_if_empty()
            .push(api_key);
        Ok(url)
    }

    fn transport_error(&self, error: reqwest::Error) -> CollaboratorError {
        if error.is_timeout() {
            CollaboratorError::Timeout(self.timeout)
        } else {
            CollaboratorError::Transport(error.to_string())
        }
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<IssuedCredential, CollaboratorError> {
        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status(status.as_u16()));
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;

        if !envelope.success {
            return Err(CollaboratorError::Rejected("service reported failure".into()));
        }

        envelope
            .data
            .filter(|data| !data.access_token.is_empty())
            .ok_or_else(|| CollaboratorError::InvalidResponse("missing access_token".into()))
    }
}

#[async_trait]
impl SessionCollaborator for HttpSessionCollaborator {
    async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientContext,
    ) -> Result<IssuedCredential, CollaboratorError> {
        let body = RefreshRequest {
            refresh_token,
            ip: client.ip.as_deref(),
            agent: client.user_agent.as_deref(),
        };

        let response = self
            .client
            .post(self.refresh_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.handle_response(response).await
    }

    async fn login_with_api_key(
        &self,
        api_key: &str,
        _client: &ClientContext,
    ) -> Result<IssuedCredential, CollaboratorError> {
        let url = self.api_key_url(api_key)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.handle_response(response).await
    }
}
