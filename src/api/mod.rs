mod identity;
mod ws;

use axum::{Router, middleware, routing::get};

use crate::auth::{Authenticator, enforce_roles};

/// Role that may call the admin endpoint.
pub const ADMIN_ROLE: &str = "admin";

/// Create the API router. Expects `authenticate` to be layered around it.
pub fn create_api_router(auth: &Authenticator) -> Router {
    let admin = Router::new()
        .route("/", get(identity::admin_handler))
        .route_layer(middleware::from_fn_with_state(
            auth.require_roles(&[ADMIN_ROLE]),
            enforce_roles,
        ));

    Router::new()
        .route("/me", get(identity::me_handler))
        .nest("/admin", admin)
        .nest("/ws", ws::router())
}
