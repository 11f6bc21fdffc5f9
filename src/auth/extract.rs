//! Locates credential material in an inbound request.

use axum::http::{HeaderMap, header};

use super::cookie::{
    ACCESS_COOKIE_NAME, API_KEY_COOKIE_NAME, CookieSigner, REFRESH_COOKIE_NAME,
};
use super::service::is_trusted_service;
use crate::config::{AuthConfig, SERVICE_IDENTITY_HEADER, SERVICE_KEY_HEADER};

const BEARER_PREFIX: &str = "Bearer ";

/// User credentials found on a request. Every field is optional; all `None`
/// is an anonymous request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// The authoritative access-proving token, `Bearer ` prefix removed
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub api_key: Option<String>,
}

/// What the extractor found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A trusted service presented the service key. Nothing else was read.
    Service { identity_header: Option<String> },
    User(Credentials),
}

/// Read credentials from request headers.
///
/// Access token precedence: the signed `access_token` cookie, unless an
/// `Authorization` header is present whose value differs from the signed
/// `api_key` cookie, in which case the header wins. A header equal to the
/// API key is a replay of that key, not a fresh bearer token; both `k1` and
/// `Bearer k1` count as a replay of key `k1`. An empty bearer is ignored.
pub fn extract(headers: &HeaderMap, config: &AuthConfig, signer: &CookieSigner) -> Extraction {
    let service_key = headers
        .get(SERVICE_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Some(service_key) = service_key {
        if is_trusted_service(service_key, config) {
            let identity_header = headers
                .get(SERVICE_IDENTITY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Extraction::Service { identity_header };
        }
    }

    let api_key = signer.get_signed(headers, API_KEY_COOKIE_NAME);
    let mut access_token = signer.get_signed(headers, ACCESS_COOKIE_NAME);

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !bearer_token(v).is_empty());
    if let Some(authorization) = authorization {
        let bearer = bearer_token(authorization);
        let replayed_key = api_key
            .as_deref()
            .is_some_and(|key| key == authorization || key == bearer);
        if !replayed_key {
            access_token = Some(bearer.to_string());
        }
    }

    Extraction::User(Credentials {
        access_token: access_token
            .map(|token| bearer_token(&token).to_string())
            .filter(|token| !token.is_empty()),
        refresh_token: signer.get_signed(headers, REFRESH_COOKIE_NAME),
        api_key,
    })
}

/// Strip a `Bearer ` prefix. A bare `Bearer` is an empty token.
fn bearer_token(value: &str) -> &str {
    let value = value.trim();
    if value == BEARER_PREFIX.trim_end() {
        return "";
    }
    value.strip_prefix(BEARER_PREFIX).map_or(value, str::trim)
}
