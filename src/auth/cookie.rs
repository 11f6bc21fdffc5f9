//! Cookie parsing, signing and Set-Cookie construction.
//!
//! Signed cookies use the `s:<value>.<signature>` layout, where the signature is
//! unpadded standard base64 of HMAC-SHA256(secret, value). Express apps using
//! `cookie-parser` with the same secret read and write the same format;
//! inbound values are percent-decoded before verification.

use std::time::Duration;

use axum::http::{HeaderMap, header};
use base64::{Engine, engine::general_purpose::STANDARD_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::CookieSettings;

/// Cookie name for the access token.
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Cookie name for a previously issued API key.
pub const API_KEY_COOKIE_NAME: &str = "api_key";

const SIGNED_PREFIX: &str = "s:";

type HmacSha256 = Hmac<Sha256>;

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = cookie_header.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                if key.trim() == name {
                    return Some(value.trim());
                }
            }
        }
    }
    None
}

/// Signs cookie values and verifies signed ones.
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl CookieSigner {
    pub fn new(secret: &[u8]) -> Self {
        let mac = <HmacSha256 as Mac>::new_from_slice(secret)
            .expect("HMAC can take key of any size");
        Self { mac }
    }

    /// Produce the signed form of `value`.
    pub fn sign(&self, value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        let signature = STANDARD_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}{}.{}", SIGNED_PREFIX, value, signature)
    }

    /// Return the inner value if `raw` is a correctly signed cookie value.
    /// The value is percent-decoded first, as cookie-parser does, so wholly
    /// encoded values (`s%3A...%2F...`) verify too. Unsigned values and bad
    /// signatures yield `None`.
    pub fn unsign(&self, raw: &str) -> Option<String> {
        let decoded = urlencoding::decode(raw).ok()?;
        let signed = decoded.strip_prefix(SIGNED_PREFIX)?;
        let (value, signature) = signed.rsplit_once('.')?;
        let signature = STANDARD_NO_PAD.decode(signature.trim_end_matches('=')).ok()?;

        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&signature).ok()?;
        Some(value.to_string())
    }

    /// Read and verify a signed cookie from request headers.
    pub fn get_signed(&self, headers: &HeaderMap, name: &str) -> Option<String> {
        get_cookie(headers, name).and_then(|raw| self.unsign(raw))
    }
}

/// Build a Set-Cookie header value for a signed cookie.
pub fn set_cookie_header(
    name: &str,
    signed_value: &str,
    settings: &CookieSettings,
    max_age: Duration,
) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path={}; Max-Age={}{}",
        name,
        signed_value,
        settings.path,
        max_age.as_secs(),
        attribute_suffix(settings)
    )
}

/// Build a Set-Cookie header value that removes a cookie.
pub fn clear_cookie_header(name: &str, settings: &CookieSettings) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path={}; Max-Age=0{}",
        name,
        settings.path,
        attribute_suffix(settings)
    )
}

fn attribute_suffix(settings: &CookieSettings) -> String {
    let mut suffix = String::new();
    if let Some(domain) = &settings.domain {
        suffix.push_str("; Domain=");
        suffix.push_str(domain);
    }
    if settings.secure {
        suffix.push_str("; Secure");
    }
    suffix
}
