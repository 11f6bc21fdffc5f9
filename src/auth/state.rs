//! Shared, immutable state of the authentication layer.

use std::sync::Arc;

use axum::http::HeaderMap;

use super::collaborator::{ClientContext, SessionCollaborator};
use super::cookie::CookieSigner;
use super::extract::{Extraction, extract};
use super::resolver::{ResolutionResult, Resolver};
use super::service::service_identity;
use super::session::SessionMutator;
use crate::config::AuthConfig;

/// Everything the middleware needs. Cheap to clone.
#[derive(Clone)]
pub struct Authenticator {
    inner: Arc<Inner>,
}

struct Inner {
    config: AuthConfig,
    signer: CookieSigner,
    resolver: Resolver,
    mutator: SessionMutator,
}

impl Authenticator {
    pub fn new(config: AuthConfig, collaborator: Arc<dyn SessionCollaborator>) -> Self {
        let signer = CookieSigner::new(&config.secret);
        let resolver = Resolver::new(&config, collaborator);
        let mutator = SessionMutator::new(signer.clone(), config.cookie_settings());
        Self {
            inner: Arc::new(Inner {
                config,
                signer,
                resolver,
                mutator,
            }),
        }
    }

    pub fn mutator(&self) -> &SessionMutator {
        &self.inner.mutator
    }

    /// Run extraction, the service shortcut and the resolver for one request.
    pub async fn resolve(&self, headers: &HeaderMap, client: &ClientContext) -> ResolutionResult {
        match extract(headers, &self.inner.config, &self.inner.signer) {
            Extraction::Service { identity_header } => {
                tracing::debug!("Trusted service call");
                ResolutionResult::Resolved(service_identity(identity_header.as_deref()))
            }
            Extraction::User(credentials) => {
                self.inner.resolver.resolve(&credentials, client).await
            }
        }
    }
}
