use std::net::SocketAddr;

use clap::Parser;
use gatehouse::cli::{Args, build_collaborator, build_config, init_logging, load_secret};
use gatehouse::create_app;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(secret) = load_secret(args.secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(collaborator) = build_collaborator(&args) else {
        std::process::exit(1);
    };

    let config = build_config(&args, secret, collaborator);
    info!(environment = ?config.auth.environment, "Authentication configured");

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
