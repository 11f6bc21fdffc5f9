//! Request authentication.
//!
//! Credentials come from signed cookies, a bearer header, or a service key.
//! Expired access tokens are renewed through a `SessionCollaborator`; the
//! renewed token is written back as a cookie before the handler's response
//! leaves. Broken or stale cookies are cleared and the caller continues as
//! anonymous.

mod claims;
mod collaborator;
mod cookie;
mod errors;
mod extract;
mod extractors;
mod http_client;
mod ip;
mod middleware;
mod resolver;
mod service;
mod session;
mod state;
mod verify;

pub use claims::{Identity, SUPERUSER_LEVEL};
pub use collaborator::{
    ClientContext, CollaboratorError, IssuedCredential, NoCollaborator, SessionCollaborator,
};
pub use cookie::{
    ACCESS_COOKIE_NAME, API_KEY_COOKIE_NAME, CookieSigner, REFRESH_COOKIE_NAME, get_cookie,
};
pub use errors::{ApiAuthError, AuthError, AuthErrorKind};
pub use extract::{Credentials, Extraction, extract};
pub use extractors::{Auth, MaybeAuth, RoleGuard, enforce_roles};
pub use http_client::HttpSessionCollaborator;
pub use ip::{client_context, extract_client_ip};
pub use middleware::authenticate;
pub use resolver::{ResolutionResult, Resolver};
pub use service::{is_trusted_service, parse_service_identity, service_identity};
pub use session::{SessionMutation, SessionMutator};
pub use state::Authenticator;
pub use verify::{VerificationOutcome, verify};
