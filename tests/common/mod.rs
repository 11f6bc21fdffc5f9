#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use gatehouse::auth::{
    Authenticator, ClientContext, CollaboratorError, CookieSigner, Identity, IssuedCredential,
    SessionCollaborator,
};
use gatehouse::config::{AuthConfig, Environment};
use gatehouse::create_app_with;
use gatehouse::jwt::JwtCodec;
use serde_json::Value;

pub const TEST_SECRET: &[u8] = b"test-secret-that-is-long-enough-32b";
pub const TEST_SERVICE_KEY: &str = "service-key-for-tests";
pub const TEST_IP: &str = "203.0.113.7";
pub const TEST_AGENT: &str = "gatehouse-tests/1.0";

/// A recorded collaborator call: (operation, credential, client).
pub type Call = (&'static str, String, ClientContext);

/// In-process stand-in for the account service.
///
/// Known refresh tokens and API keys map to the identity a fresh token is
/// issued for. Anything else is rejected.
#[derive(Default)]
pub struct MockAccounts {
    refresh_tokens: HashMap<String, Identity>,
    api_keys: HashMap<String, Identity>,
    calls: Mutex<Vec<Call>>,
}

impl MockAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_refresh_token(mut self, token: &str, identity: Identity) -> Self {
        self.refresh_tokens.insert(token.to_string(), identity);
        self
    }

    pub fn with_api_key(mut self, key: &str, identity: Identity) -> Self {
        self.api_keys.insert(key.to_string(), identity);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn issue(
        &self,
        table: &HashMap<String, Identity>,
        credential: &str,
    ) -> Result<IssuedCredential, CollaboratorError> {
        let identity = table
            .get(credential)
            .ok_or_else(|| CollaboratorError::Rejected("unknown credential".into()))?;
        let access_token = codec()
            .sign(identity, Duration::from_secs(3600))
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
        Ok(IssuedCredential { access_token })
    }
}

#[async_trait]
impl SessionCollaborator for MockAccounts {
    async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientContext,
    ) -> Result<IssuedCredential, CollaboratorError> {
        self.calls
            .lock()
            .unwrap()
            .push(("refresh", refresh_token.to_string(), client.clone()));
        self.issue(&self.refresh_tokens, refresh_token)
    }

    async fn login_with_api_key(
        &self,
        api_key: &str,
        client: &ClientContext,
    ) -> Result<IssuedCredential, CollaboratorError> {
        self.calls
            .lock()
            .unwrap()
            .push(("api_key", api_key.to_string(), client.clone()));
        self.issue(&self.api_keys, api_key)
    }
}

pub fn test_config() -> AuthConfig {
    AuthConfig::new(TEST_SECRET.to_vec())
        .with_environment(Environment::Development)
        .with_service_key(TEST_SERVICE_KEY)
}

/// Build the app around `accounts` and return it alongside the mock for call inspection.
pub fn create_test_app(accounts: MockAccounts) -> (axum::Router, Arc<MockAccounts>) {
    create_test_app_with_config(test_config(), accounts)
}

pub fn create_test_app_with_config(
    config: AuthConfig,
    accounts: MockAccounts,
) -> (axum::Router, Arc<MockAccounts>) {
    let accounts = Arc::new(accounts);
    let auth = Authenticator::new(config, accounts.clone());
    (create_app_with(auth), accounts)
}

pub fn codec() -> JwtCodec {
    JwtCodec::new(TEST_SECRET)
}

pub fn signer() -> CookieSigner {
    CookieSigner::new(TEST_SECRET)
}

pub fn user(name: &str) -> Identity {
    Identity::new().with("user", name).with("level", 1)
}

/// A valid token for `identity`, one hour from expiry.
pub fn valid_token(identity: &Identity) -> String {
    codec().sign(identity, Duration::from_secs(3600)).unwrap()
}

/// A token for `identity` that expired a minute ago.
pub fn expired_token(identity: &Identity) -> String {
    let now = gatehouse::jwt::unix_now().unwrap();
    let claims = identity
        .clone()
        .with("iat", now - 7200)
        .with("exp", now - 60);
    codec().sign_raw(&claims).unwrap()
}

/// A `name=<signed value>` pair for a Cookie header.
pub fn signed_cookie(name: &str, value: &str) -> String {
    format!("{}={}", name, signer().sign(value))
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Check if cookies contain a token being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=;", cookie_name)) && c.contains("Max-Age=0"))
}

/// The access token carried by a non-clearing Set-Cookie, unsigned.
pub fn new_access_token(cookies: &[String]) -> Option<String> {
    cookies.iter().find_map(|c| {
        let value = c.strip_prefix("access_token=")?.split(';').next()?;
        signer().unsign(value)
    })
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
