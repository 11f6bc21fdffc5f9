pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod jwt;

use api::create_api_router;
use auth::{Authenticator, SessionCollaborator, authenticate};
use axum::{Json, Router, middleware, routing::get};
use config::AuthConfig;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Authentication layer configuration
    pub auth: AuthConfig,
    /// Refresh and API-key login backend
    pub collaborator: Arc<dyn SessionCollaborator>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let auth = Authenticator::new(config.auth.clone(), config.collaborator.clone());
    create_app_with(auth)
}

/// Create the application router around an existing authenticator.
pub fn create_app_with(auth: Authenticator) -> Router {
    Router::new()
        .route("/", get(welcome))
        .nest("/api", create_api_router(&auth))
        .layer(middleware::from_fn_with_state(auth, authenticate))
}

async fn welcome() -> Json<Value> {
    Json(json!({ "success": true, "data": "welcome" }))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let
/// the OS choose a random port. Returns the actual address the server is
/// listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
