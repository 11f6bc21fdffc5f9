//! Writes resolution outcomes back onto the client's session cookies.
//!
//! Only ever writes response headers; never reads the request.

use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue, header};

use super::cookie::{
    ACCESS_COOKIE_NAME, CookieSigner, REFRESH_COOKIE_NAME, clear_cookie_header, set_cookie_header,
};
use super::resolver::ResolutionResult;
use crate::config::CookieSettings;
use crate::jwt::remaining_lifetime;

/// Cookie changes a resolution requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMutation {
    Unchanged,
    /// Store a renewed access token. Refresh and API-key cookies are kept.
    SetAccessToken { token: String, max_age: Duration },
    /// Drop the access and refresh cookies.
    Clear,
}

/// Turns resolution results into Set-Cookie headers.
#[derive(Clone)]
pub struct SessionMutator {
    signer: CookieSigner,
    settings: CookieSettings,
}

impl SessionMutator {
    pub fn new(signer: CookieSigner, settings: CookieSettings) -> Self {
        Self { signer, settings }
    }

    /// Decide what a result does to the session.
    pub fn plan(&self, result: &ResolutionResult) -> SessionMutation {
        match result {
            ResolutionResult::RefreshedAndResolved {
                identity,
                access_token,
            } => {
                let max_age = remaining_lifetime(identity)
                    .map_or(self.settings.max_age, |left| left.min(self.settings.max_age));
                SessionMutation::SetAccessToken {
                    token: access_token.clone(),
                    max_age,
                }
            }
            ResolutionResult::Rejected(_)
            | ResolutionResult::Unauthenticated { failure: Some(_) } => SessionMutation::Clear,
            ResolutionResult::Resolved(_) | ResolutionResult::Unauthenticated { failure: None } => {
                SessionMutation::Unchanged
            }
        }
    }

    /// Set-Cookie header values for a mutation.
    pub fn cookie_headers(&self, mutation: &SessionMutation) -> Vec<String> {
        match mutation {
            SessionMutation::Unchanged => Vec::new(),
            SessionMutation::SetAccessToken { token, max_age } => vec![set_cookie_header(
                ACCESS_COOKIE_NAME,
                &self.signer.sign(token),
                &self.settings,
                *max_age,
            )],
            SessionMutation::Clear => vec![
                clear_cookie_header(ACCESS_COOKIE_NAME, &self.settings),
                clear_cookie_header(REFRESH_COOKIE_NAME, &self.settings),
            ],
        }
    }

    /// Append the mutation's Set-Cookie headers to a response.
    pub fn write(&self, mutation: &SessionMutation, headers: &mut HeaderMap) {
        for cookie in self.cookie_headers(mutation) {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                }
                Err(e) => tracing::error!(error = %e, "Refusing to emit invalid Set-Cookie header"),
            }
        }
    }
}
