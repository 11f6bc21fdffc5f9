//! Credential resolution.
//!
//! Turns extracted credentials into an identity, a renewed session, an
//! anonymous pass-through, or a rejection. Evaluation order:
//!
//! 1. No access token: anonymous.
//! 2. Valid access token: resolved.
//! 3. Expired: refresh token if present, else the `api_key` cookie if
//!    present, else reject. A failed refresh rejects; a failed API-key login
//!    degrades to anonymous.
//! 4. Malformed: the token itself is tried as an API key; failure degrades
//!    to anonymous as a malformed credential.
//! 5. Any other verification failure: anonymous.
//!
//! Every degraded outcome carries the error so the session mutator clears
//! the stale cookies. The API-key collaborator only ever receives opaque
//! keys: the `api_key` cookie on the expired path, the undecodable token on
//! the malformed path. An expired JWT is never sent as an API key.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, warn};

use super::claims::Identity;
use super::collaborator::{ClientContext, CollaboratorError, SessionCollaborator};
use super::errors::AuthError;
use super::extract::Credentials;
use super::verify::{VerificationOutcome, verify};
use crate::config::AuthConfig;
use crate::jwt::JwtCodec;

/// Outcome of resolving a request's credentials.
#[derive(Debug)]
pub enum ResolutionResult {
    Resolved(Identity),
    /// A collaborator issued a new access token. It must reach the client
    /// before `identity` is exposed downstream.
    RefreshedAndResolved {
        identity: Identity,
        access_token: String,
    },
    /// No identity. `failure` is set when a credential was presented but
    /// could not be used; the session cookies are then stale.
    Unauthenticated { failure: Option<AuthError> },
    /// Terminal: the request stops with an authentication error.
    Rejected(AuthError),
}

impl ResolutionResult {
    pub fn anonymous() -> Self {
        Self::Unauthenticated { failure: None }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Resolved(_) => "resolved",
            Self::RefreshedAndResolved { .. } => "refreshed",
            Self::Unauthenticated { failure: None } => "anonymous",
            Self::Unauthenticated { failure: Some(_) } => "degraded",
            Self::Rejected(_) => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Renewal {
    Refresh,
    ApiKey,
}

/// Resolves credentials against the token codec and the session collaborator.
#[derive(Clone)]
pub struct Resolver {
    codec: JwtCodec,
    collaborator: Arc<dyn SessionCollaborator>,
    timeout: Duration,
}

impl Resolver {
    pub fn new(config: &AuthConfig, collaborator: Arc<dyn SessionCollaborator>) -> Self {
        Self {
            codec: JwtCodec::new(&config.secret),
            collaborator,
            timeout: config.collaborator_timeout,
        }
    }

    pub async fn resolve(
        &self,
        credentials: &Credentials,
        client: &ClientContext,
    ) -> ResolutionResult {
        let result = self.resolve_inner(credentials, client).await;
        match &result {
            ResolutionResult::Unauthenticated { failure: Some(e) }
            | ResolutionResult::Rejected(e) => {
                debug!(outcome = result.label(), error = %e, "Resolved credentials")
            }
            _ => debug!(outcome = result.label(), "Resolved credentials"),
        }
        result
    }

    async fn resolve_inner(
        &self,
        credentials: &Credentials,
        client: &ClientContext,
    ) -> ResolutionResult {
        let Some(token) = credentials.access_token.as_deref() else {
            return ResolutionResult::anonymous();
        };

        match verify(&self.codec, token) {
            VerificationOutcome::Valid(identity) => ResolutionResult::Resolved(identity),
            VerificationOutcome::Expired => self.resolve_expired(credentials, client).await,
            VerificationOutcome::Malformed => self
                .renew(Renewal::ApiKey, token, client)
                .await
                .unwrap_or_else(|_| ResolutionResult::Unauthenticated {
                    failure: Some(AuthError::MalformedCredential),
                }),
            VerificationOutcome::Other(e) => ResolutionResult::Unauthenticated {
                failure: Some(AuthError::VerificationFailure(e.to_string())),
            },
        }
    }

    async fn resolve_expired(
        &self,
        credentials: &Credentials,
        client: &ClientContext,
    ) -> ResolutionResult {
        if let Some(refresh_token) = credentials.refresh_token.as_deref() {
            return match self.renew(Renewal::Refresh, refresh_token, client).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Refresh failed for expired access token");
                    ResolutionResult::Rejected(AuthError::CredentialExpiredNoFallback {
                        refresh_attempted: true,
                    })
                }
            };
        }

        if let Some(api_key) = credentials.api_key.as_deref() {
            return self
                .renew(Renewal::ApiKey, api_key, client)
                .await
                .unwrap_or_else(|e| ResolutionResult::Unauthenticated { failure: Some(e) });
        }

        ResolutionResult::Rejected(AuthError::CredentialExpiredNoFallback {
            refresh_attempted: false,
        })
    }

    /// Make the single collaborator call for this request and decode what it
    /// issued. Errors, timeouts and panics all come back as `CollaboratorFailure`.
    async fn renew(
        &self,
        renewal: Renewal,
        credential: &str,
        client: &ClientContext,
    ) -> Result<ResolutionResult, AuthError> {
        let call = match renewal {
            Renewal::Refresh => self.collaborator.refresh(credential, client),
            Renewal::ApiKey => self.collaborator.login_with_api_key(credential, client),
        };

        let issued = match tokio::time::timeout(self.timeout, AssertUnwindSafe(call).catch_unwind())
            .await
        {
            Ok(Ok(Ok(issued))) => issued,
            Ok(Ok(Err(e))) => {
                warn!(?renewal, error = %e, "Collaborator call failed");
                return Err(e.into());
            }
            Ok(Err(_)) => {
                warn!(?renewal, "Collaborator panicked");
                return Err(CollaboratorError::Transport("collaborator panicked".into()).into());
            }
            Err(_) => {
                warn!(?renewal, timeout = ?self.timeout, "Collaborator call timed out");
                return Err(CollaboratorError::Timeout(self.timeout).into());
            }
        };

        let identity = self.codec.verify(&issued.access_token).map_err(|e| {
            CollaboratorError::InvalidResponse(format!("issued token does not verify: {}", e))
        })?;

        Ok(ResolutionResult::RefreshedAndResolved {
            identity,
            access_token: issued.access_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::collaborator::IssuedCredential;
    use crate::jwt::unix_now;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    const SECRET: &[u8] = b"resolver-test-secret";

    /// Records every call and answers from fixed tables.
    #[derive(Default)]
    struct ScriptedCollaborator {
        refresh_answers: Vec<(String, String)>,
        api_key_answers: Vec<(String, String)>,
        delay: Option<Duration>,
        panic: bool,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedCollaborator {
        fn answer(
            table: &[(String, String)],
            key: &str,
        ) -> Result<IssuedCredential, CollaboratorError> {
            table
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, token)| IssuedCredential {
                    access_token: token.clone(),
                })
                .ok_or_else(|| CollaboratorError::Rejected(key.to_string()))
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SessionCollaborator for ScriptedCollaborator {
        async fn refresh(
            &self,
            refresh_token: &str,
            _client: &ClientContext,
        ) -> Result<IssuedCredential, CollaboratorError> {
            self.calls.lock().unwrap().push(format!("refresh:{refresh_token}"));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.panic {
                panic!("collaborator bug");
            }
            Self::answer(&self.refresh_answers, refresh_token)
        }

        async fn login_with_api_key(
            &self,
            api_key: &str,
            _client: &ClientContext,
        ) -> Result<IssuedCredential, CollaboratorError> {
            self.calls.lock().unwrap().push(format!("api_key:{api_key}"));
            Self::answer(&self.api_key_answers, api_key)
        }
    }

    fn codec() -> JwtCodec {
        JwtCodec::new(SECRET)
    }

    fn user_42() -> Identity {
        Identity::new()
            .with("user", "42")
            .with("level", 1)
            .with("roles", json!(["x"]))
    }

    fn valid_token(identity: &Identity) -> String {
        codec().sign(identity, Duration::from_secs(300)).unwrap()
    }

    fn expired_token() -> String {
        let now = unix_now().unwrap();
        codec().sign_raw(&user_42().with("exp", now - 60)).unwrap()
    }

    fn resolver(collaborator: Arc<ScriptedCollaborator>) -> Resolver {
        Resolver::new(&AuthConfig::new(SECRET.to_vec()), collaborator)
    }

    fn credentials(
        access: Option<&str>,
        refresh: Option<&str>,
        api_key: Option<&str>,
    ) -> Credentials {
        Credentials {
            access_token: access.map(str::to_string),
            refresh_token: refresh.map(str::to_string),
            api_key: api_key.map(str::to_string),
        }
    }

    async fn run(collaborator: &Arc<ScriptedCollaborator>, creds: Credentials) -> ResolutionResult {
        resolver(collaborator.clone())
            .resolve(&creds, &ClientContext::default())
            .await
    }

    #[tokio::test]
    async fn test_no_credentials_is_anonymous() {
        let collaborator = Arc::new(ScriptedCollaborator::default());
        let result = run(&collaborator, Credentials::default()).await;

        assert!(matches!(result, ResolutionResult::Unauthenticated { failure: None }));
        assert!(collaborator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_cookie_alone_is_anonymous() {
        let collaborator = Arc::new(ScriptedCollaborator::default());
        let result = run(&collaborator, credentials(None, Some("r1"), Some("k1"))).await;

        assert!(matches!(result, ResolutionResult::Unauthenticated { failure: None }));
        assert!(collaborator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_valid_token_resolves_exact_claims() {
        let collaborator = Arc::new(ScriptedCollaborator::default());
        let token = codec().sign_raw(&user_42()).unwrap();
        let result = run(&collaborator, credentials(Some(&token), None, None)).await;

        match result {
            ResolutionResult::Resolved(identity) => assert_eq!(identity, user_42()),
            other => panic!("expected resolved, got {:?}", other),
        }
        assert!(collaborator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_expired_with_refresh_renews() {
        let new_token = valid_token(&user_42().with("fresh", true));
        let collaborator = Arc::new(ScriptedCollaborator {
            refresh_answers: vec![("r1".into(), new_token.clone())],
            ..Default::default()
        });

        let result = run(
            &collaborator,
            credentials(Some(&expired_token()), Some("r1"), None),
        )
        .await;

        match result {
            ResolutionResult::RefreshedAndResolved {
                identity,
                access_token,
            } => {
                assert_eq!(access_token, new_token);
                assert_eq!(identity.get("fresh"), Some(&json!(true)));
            }
            other => panic!("expected refresh, got {:?}", other),
        }
        assert_eq!(collaborator.calls(), vec!["refresh:r1"]);
    }

    #[tokio::test]
    async fn test_expired_refresh_failure_rejects_without_api_key_fallback() {
        let collaborator = Arc::new(ScriptedCollaborator {
            api_key_answers: vec![("k1".into(), valid_token(&user_42()))],
            ..Default::default()
        });

        let result = run(
            &collaborator,
            credentials(Some(&expired_token()), Some("bad"), Some("k1")),
        )
        .await;

        assert!(matches!(
            result,
            ResolutionResult::Rejected(AuthError::CredentialExpiredNoFallback {
                refresh_attempted: true
            })
        ));
        assert_eq!(collaborator.calls(), vec!["refresh:bad"]);
    }

    #[tokio::test]
    async fn test_expired_uses_api_key_cookie() {
        let collaborator = Arc::new(ScriptedCollaborator {
            api_key_answers: vec![("k1".into(), valid_token(&user_42()))],
            ..Default::default()
        });

        let expired = expired_token();
        let result = run(&collaborator, credentials(Some(&expired), None, Some("k1"))).await;

        assert!(matches!(result, ResolutionResult::RefreshedAndResolved { .. }));
        assert_eq!(collaborator.calls(), vec!["api_key:k1"]);
    }

    #[tokio::test]
    async fn test_expired_api_key_failure_degrades() {
        let collaborator = Arc::new(ScriptedCollaborator::default());
        let result = run(
            &collaborator,
            credentials(Some(&expired_token()), None, Some("k1")),
        )
        .await;

        assert!(matches!(
            result,
            ResolutionResult::Unauthenticated {
                failure: Some(AuthError::CollaboratorFailure(CollaboratorError::Rejected(_)))
            }
        ));
    }

    #[tokio::test]
    async fn test_not_yet_valid_token_degrades_without_collaborator_call() {
        let collaborator = Arc::new(ScriptedCollaborator {
            api_key_answers: vec![("k1".into(), valid_token(&user_42()))],
            ..Default::default()
        });
        let now = unix_now().unwrap();
        let token = codec().sign_raw(&user_42().with("nbf", now + 3600)).unwrap();

        let result = run(&collaborator, credentials(Some(&token), Some("r1"), Some("k1"))).await;

        assert!(matches!(
            result,
            ResolutionResult::Unauthenticated {
                failure: Some(AuthError::VerificationFailure(_))
            }
        ));
        assert!(collaborator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_expired_without_fallback_rejects() {
        let collaborator = Arc::new(ScriptedCollaborator::default());
        let result = run(&collaborator, credentials(Some(&expired_token()), None, None)).await;

        assert!(matches!(
            result,
            ResolutionResult::Rejected(AuthError::CredentialExpiredNoFallback {
                refresh_attempted: false
            })
        ));
        assert!(collaborator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_token_tried_as_api_key() {
        let collaborator = Arc::new(ScriptedCollaborator {
            api_key_answers: vec![("opaque-key".into(), valid_token(&user_42()))],
            ..Default::default()
        });

        let result = run(
            &collaborator,
            credentials(Some("opaque-key"), Some("r1"), Some("k1")),
        )
        .await;

        match result {
            ResolutionResult::RefreshedAndResolved { identity, .. } => {
                assert_eq!(identity.get("user"), Some(&json!("42")))
            }
            other => panic!("expected api-key renewal, got {:?}", other),
        }
        assert_eq!(collaborator.calls(), vec!["api_key:opaque-key"]);
    }

    #[tokio::test]
    async fn test_malformed_token_unknown_key_degrades() {
        let collaborator = Arc::new(ScriptedCollaborator::default());
        let result = run(&collaborator, credentials(Some("garbage"), None, None)).await;

        assert!(matches!(
            result,
            ResolutionResult::Unauthenticated {
                failure: Some(AuthError::MalformedCredential)
            }
        ));
        assert_eq!(collaborator.calls(), vec!["api_key:garbage"]);
    }

    #[tokio::test]
    async fn test_issued_token_that_does_not_verify_degrades() {
        let collaborator = Arc::new(ScriptedCollaborator {
            api_key_answers: vec![("k1".into(), "not-a-token".into())],
            ..Default::default()
        });

        let result = run(
            &collaborator,
            credentials(Some(&expired_token()), None, Some("k1")),
        )
        .await;

        assert!(matches!(
            result,
            ResolutionResult::Unauthenticated {
                failure: Some(AuthError::CollaboratorFailure(
                    CollaboratorError::InvalidResponse(_)
                ))
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_collaborator_timeout_counts_as_failure() {
        let collaborator = Arc::new(ScriptedCollaborator {
            refresh_answers: vec![("r1".into(), valid_token(&user_42()))],
            delay: Some(Duration::from_secs(60)),
            ..Default::default()
        });

        let result = run(
            &collaborator,
            credentials(Some(&expired_token()), Some("r1"), None),
        )
        .await;

        assert!(matches!(result, ResolutionResult::Rejected(_)));
    }

    #[tokio::test]
    async fn test_collaborator_panic_is_contained() {
        let collaborator = Arc::new(ScriptedCollaborator {
            panic: true,
            ..Default::default()
        });

        let result = run(
            &collaborator,
            credentials(Some(&expired_token()), Some("r1"), None),
        )
        .await;

        assert!(matches!(result, ResolutionResult::Rejected(_)));
    }
}
