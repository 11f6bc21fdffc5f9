//! Request authentication middleware.
//!
//! ```ignore
//! let auth = Authenticator::new(config, collaborator);
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .layer(middleware::from_fn_with_state(auth, authenticate));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::ip::client_context;
use super::resolver::ResolutionResult;
use super::state::Authenticator;

/// Resolve the caller and attach their `Identity` to request extensions.
///
/// The session mutation is planned before the identity is handed downstream
/// and is written to whatever response comes back, so a handler never sees an
/// identity whose renewed credential does not reach the client. Anonymous
/// callers pass through. Only an expired token that could not be renewed
/// stops the request.
pub async fn authenticate(
    State(auth): State<Authenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    let client = client_context(&request);
    let result = auth.resolve(request.headers(), &client).await;
    let mutation = auth.mutator().plan(&result);

    let mut response = match result {
        ResolutionResult::Rejected(e) => {
            tracing::info!(error = %e, "Rejecting request");
            let kind = if e.is_terminal() {
                AuthErrorKind::CredentialExpired
            } else {
                AuthErrorKind::NotAuthenticated
            };
            ApiAuthError::new(kind).into_response()
        }
        ResolutionResult::Resolved(identity)
        | ResolutionResult::RefreshedAndResolved { identity, .. } => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        ResolutionResult::Unauthenticated { .. } => next.run(request).await,
    };

    auth.mutator().write(&mutation, response.headers_mut());
    response
}
