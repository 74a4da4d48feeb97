//! Server configuration loaded from the environment.
//!
//! A `.env` file in the working directory is honored for local
//! development. Every variable has a default except `TEACHER_API_TOKEN`,
//! which is optional and switches start/stop from open access to a
//! shared bearer token.

use std::net::SocketAddr;
use std::time::Duration;

use rollcall_session::SessionConfig;

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Everything the server binary needs at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    /// Browser origin allowed by CORS.
    pub client_url: String,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
    pub session: SessionConfig,
    /// When set, start/stop require `Authorization: Bearer <token>`.
    pub teacher_api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 4000)),
            client_url: "http://localhost:5173".to_string(),
            log_filter: "info".to_string(),
            session: SessionConfig::default(),
            teacher_api_token: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// `.env` is skipped under `cfg(test)` so tests stay hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_address = match lookup("BIND_ADDRESS") {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".into(), e.to_string()))?,
            None => defaults.bind_address,
        };

        let client_url = lookup("CLIENT_URL").unwrap_or(defaults.client_url);
        if client_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "CLIENT_URL".into(),
                "must not be empty".into(),
            ));
        }

        let log_filter = lookup("RUST_LOG").unwrap_or(defaults.log_filter);

        let mut session = defaults.session;
        if let Some(lifetime) = seconds(&lookup, "SESSION_LIFETIME_SECS")? {
            session.lifetime = lifetime;
        }
        if let Some(period) = seconds(&lookup, "ROTATION_PERIOD_SECS")? {
            session.rotation_period = period;
        }
        session.validate().map_err(|e| {
            // Blame the period only when it was set and the lifetime is in range.
            let key = if session.lifetime > SessionConfig::MAX_LIFETIME
                || lookup("ROTATION_PERIOD_SECS").is_none()
            {
                "SESSION_LIFETIME_SECS"
            } else {
                "ROTATION_PERIOD_SECS"
            };
            ConfigError::InvalidValue(key.into(), e.to_string())
        })?;

        let teacher_api_token = lookup("TEACHER_API_TOKEN").filter(|t| !t.is_empty());

        Ok(Self {
            bind_address,
            client_url,
            log_filter,
            session,
            teacher_api_token,
        })
    }
}

/// Reads a positive whole number of seconds.
fn seconds<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue(key.into(), "must be positive".into())),
        Ok(secs) => Ok(Some(Duration::from_secs(secs))),
        Err(e) => Err(ConfigError::InvalidValue(key.into(), e.to_string())),
    }
}
