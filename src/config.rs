//! Authentication layer configuration.
//!
//! Everything the layer needs is passed in at construction. Nothing here reads
//! environment variables; the binary does that in `cli` and hands the result over.

use std::time::Duration;

/// Header carrying the pre-shared service key.
pub const SERVICE_KEY_HEADER: &str = "x-app-secret";

/// Header carrying a JSON-serialized identity on service-to-service calls.
pub const SERVICE_IDENTITY_HEADER: &str = "x-app-user";

/// Default cookie lifetime: 1 year.
pub const DEFAULT_COOKIE_MAX_AGE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Default bound on a single refresh or API-key login call.
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Deployment environment. Controls the `Secure` cookie attribute.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

/// Attributes applied to every cookie the layer writes or clears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub secure: bool,
    pub domain: Option<String>,
    pub path: String,
    pub max_age: Duration,
}

/// Configuration for the authentication layer.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared secret for token verification and cookie signing
    pub secret: Vec<u8>,
    /// Service-trust key. Falls back to the shared secret when unset.
    pub service_key: Option<String>,
    pub environment: Environment,
    pub cookie_domain: Option<String>,
    pub cookie_path: String,
    pub cookie_max_age: Duration,
    pub collaborator_timeout: Duration,
}

impl AuthConfig {
    /// Create a configuration with defaults for everything but the secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            service_key: None,
            environment: Environment::default(),
            cookie_domain: None,
            cookie_path: "/".to_string(),
            cookie_max_age: DEFAULT_COOKIE_MAX_AGE,
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        self.service_key = Some(key.into());
        self
    }

    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    pub fn with_collaborator_timeout(mut self, timeout: Duration) -> Self {
        self.collaborator_timeout = timeout;
        self
    }

    /// The key that trusted services must present, as raw bytes.
    pub fn service_key_bytes(&self) -> &[u8] {
        match &self.service_key {
            Some(key) => key.as_bytes(),
            None => &self.secret,
        }
    }

    pub fn secure_cookies(&self) -> bool {
        self.environment != Environment::Development
    }

    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            secure: self.secure_cookies(),
            domain: self.cookie_domain.clone(),
            path: self.cookie_path.clone(),
            max_age: self.cookie_max_age,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("service_key", &self.service_key.as_ref().map(|_| "<redacted>"))
            .field("environment", &self.environment)
            .field("cookie_domain", &self.cookie_domain)
            .field("cookie_path", &self.cookie_path)
            .field("cookie_max_age", &self.cookie_max_age)
            .field("collaborator_timeout", &self.collaborator_timeout)
            .finish()
    }
}
