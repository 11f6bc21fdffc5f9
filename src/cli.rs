//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use url::Url;

use crate::ServerConfig;
use crate::auth::{HttpSessionCollaborator, NoCollaborator, SessionCollaborator};
use crate::config::{AuthConfig, Environment};

const MIN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "gatehouse",
    about = "Cookie and bearer-token authentication gateway"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7300")]
    pub port: u16,

    /// Path to file containing the shared secret. Prefer the SECRET_KEY env var instead
    #[arg(long)]
    pub secret_file: Option<String>,

    /// Service-trust key, if different from the shared secret
    #[arg(long, env = "SERVICE_KEY", hide_env_values = true)]
    pub service_key: Option<String>,

    /// Deployment environment. Cookies are Secure outside development
    #[arg(long, value_enum, default_value = "production")]
    pub environment: Environment,

    /// Domain attribute for session cookies
    #[arg(long)]
    pub cookie_domain: Option<String>,

    /// Refresh endpoint of the account service (POST)
    #[arg(long, requires = "api_key_url")]
    pub refresh_url: Option<String>,

    /// API-token endpoint of the account service (GET {url}/{key})
    #[arg(long, requires = "refresh_url")]
    pub api_key_url: Option<String>,

    /// Timeout for refresh and API-key calls, in seconds
    #[arg(long, default_value = "10")]
    pub collaborator_timeout: u64,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the shared secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("SECRET_KEY") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("SECRET_KEY") };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!("Secret is required. Set SECRET_KEY (recommended) or use --secret-file");
        return None;
    };

    validate_secret(secret)
}

fn validate_secret(secret: String) -> Option<String> {
    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "Secret is shorter than {} characters. Use a longer secret",
            MIN_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

fn parse_endpoint(name: &str, value: &str) -> Option<Url> {
    match Url::parse(value) {
        Ok(url) => Some(url),
        Err(e) => {
            error!(endpoint = name, url = %value, error = %e, "Invalid endpoint URL");
            None
        }
    }
}

/// Build the session collaborator from the endpoint arguments.
/// Without endpoints, expired sessions cannot be renewed.
pub fn build_collaborator(args: &Args) -> Option<Arc<dyn SessionCollaborator>> {
    let (Some(refresh), Some(api_key)) = (&args.refresh_url, &args.api_key_url) else {
        info!("No account service configured; expired sessions will not be renewed");
        return Some(Arc::new(NoCollaborator));
    };

    let refresh = parse_endpoint("refresh", refresh)?;
    let api_key = parse_endpoint("api-key", api_key)?;
    let timeout = Duration::from_secs(args.collaborator_timeout);

    match HttpSessionCollaborator::new(refresh, api_key, timeout) {
        Ok(collaborator) => Some(Arc::new(collaborator)),
        Err(e) => {
            error!(error = %e, "Failed to create account service client");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    secret: String,
    collaborator: Arc<dyn SessionCollaborator>,
) -> ServerConfig {
    let mut auth = AuthConfig::new(secret.into_bytes())
        .with_environment(args.environment)
        .with_collaborator_timeout(Duration::from_secs(args.collaborator_timeout));
    if let Some(key) = &args.service_key {
        auth = auth.with_service_key(key.clone());
    }
    if let Some(domain) = &args.cookie_domain {
        auth = auth.with_cookie_domain(domain.clone());
    }

    ServerConfig { auth, collaborator }
}
