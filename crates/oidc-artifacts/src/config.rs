//! Configuration for the signed-artifact service.

use std::time::Duration;

use crate::context::{IssuerContext, SigningSecret};
use crate::error::ConfigError;

/// Lifetime and scheduling defaults.
pub mod defaults {
    use std::time::Duration;

    /// Issuer used when neither the environment nor the request supplies one.
    pub const ISSUER: &str = "http://localhost:8000";

    /// Authorization grant lifetime: 10 minutes.
    pub const GRANT_TTL: i64 = 600;

    /// Identity assertion lifetime: 1 hour.
    pub const ASSERTION_TTL: i64 = 3600;

    /// Access token lifetime: 1 hour.
    pub const ACCESS_TOKEN_TTL: i64 = 3600;

    /// Refresh token lifetime: 30 days.
    pub const REFRESH_TOKEN_TTL: i64 = 30 * 24 * 3600;

    /// Registry sweep interval.
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

    /// Secrets shorter than this are accepted but logged as weak.
    pub const MIN_SECRET_LEN: usize = 32;
}

/// Environment variable holding the HMAC signing secret.
pub const SECRET_ENV: &str = "OIDC_SIGNING_SECRET";

/// Environment variable holding the default issuer.
pub const ISSUER_ENV: &str = "OIDC_ISSUER";

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    /// HMAC-SHA256 signing secret.
    pub signing_secret: String,

    /// Issuer used when the request does not override it.
    pub issuer: String,

    /// Authorization grant lifetime in seconds.
    pub grant_ttl: i64,

    /// Identity assertion lifetime in seconds.
    pub assertion_ttl: i64,

    /// Access token lifetime in seconds.
    pub access_token_ttl: i64,

    /// Refresh token lifetime in seconds.
    pub refresh_token_ttl: i64,

    /// Registry sweep interval.
    pub sweep_interval: Duration,
}

impl Config {
    /// Create a configuration with default lifetimes.
    #[must_use]
    pub fn new(signing_secret: impl Into<String>, issuer: Option<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            issuer: issuer.unwrap_or_else(|| defaults::ISSUER.to_string()),
            grant_ttl: defaults::GRANT_TTL,
            assertion_ttl: defaults::ASSERTION_TTL,
            access_token_ttl: defaults::ACCESS_TOKEN_TTL,
            refresh_token_ttl: defaults::REFRESH_TOKEN_TTL,
            sweep_interval: defaults::SWEEP_INTERVAL,
        }
    }

    /// Create a test configuration with a fixed secret and issuer.
    #[must_use]
    pub fn for_testing(issuer: &str) -> Self {
        Self {
            sweep_interval: Duration::from_millis(50),
            ..Self::new("test-signing-secret-0123456789abcdef", Some(issuer.to_string()))
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Loads a `.env` file first when one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let secret = std::env::var(SECRET_ENV).map_err(|_| ConfigError::Missing(SECRET_ENV))?;
        let issuer = std::env::var(ISSUER_ENV).ok();
        Ok(Self::new(secret, issuer))
    }

    /// Build the process-wide issuer context.
    pub fn issuer_context(&self) -> Result<IssuerContext, ConfigError> {
        let secret = SigningSecret::new(self.signing_secret.as_bytes())
            .map_err(|e| ConfigError::invalid(SECRET_ENV, e.to_string()))?;
        if self.signing_secret.len() < defaults::MIN_SECRET_LEN {
            tracing::warn!(
                len = self.signing_secret.len(),
                min = defaults::MIN_SECRET_LEN,
                "Signing secret is shorter than recommended"
            );
        }
        IssuerContext::new(secret, &self.issuer)
            .map_err(|e| ConfigError::invalid(ISSUER_ENV, e.to_string()))
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("signing_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("grant_ttl", &self.grant_ttl)
            .field("assertion_ttl", &self.assertion_ttl)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}
