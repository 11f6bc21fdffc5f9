//! Client metadata forwarded to session collaborators.

use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::{Request, header},
};

use super::collaborator::ClientContext;

/// Extract the client IP address.
/// Checks X-Forwarded-For first (reverse proxy), then falls back to the socket peer.
pub fn extract_client_ip<B>(request: &Request<B>) -> Option<String> {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

pub fn client_context<B>(request: &Request<B>) -> ClientContext {
    ClientContext {
        ip: extract_client_ip(request),
        user_agent: request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}
