//! Configuration management.
//!
//! Values are layered, lowest precedence first:
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `CLINIC__SECTION__KEY` environment variables
//! 4. the legacy deployment variables `SECRET_KEY`, `ALGORITHM`,
//!    `ACCESS_TOKEN_EXPIRE_MINUTES`, `DATABASE_URL` and `LOG_FORMAT`

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

/// Signing secret used when none is configured. Never acceptable in production.
pub const DEFAULT_SECRET_KEY: &str = "insecure-development-secret-change-me";

/// Default access-token lifetime in minutes.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Longest accepted access-token lifetime (one year) in minutes.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 525_600;

/// Default bound on a single directory round trip, in milliseconds.
pub const DEFAULT_DIRECTORY_TIMEOUT_MS: u64 = 5_000;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Symmetric MAC algorithm used to sign access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    #[default]
    Hs256,
    Hs384,
    Hs512,
}

impl SigningAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningAlgorithm::Hs256 => "HS256",
            SigningAlgorithm::Hs384 => "HS384",
            SigningAlgorithm::Hs512 => "HS512",
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            other => Err(format!(
                "unsupported signing algorithm '{}': expected HS256, HS384 or HS512",
                other
            )),
        }
    }
}

impl<'de> Deserialize<'de> for SigningAlgorithm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application configuration.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,
    /// HTTP server settings
    pub server: ServerConfig,
    /// Token signing and credential verification settings
    pub auth: AuthSettings,
    /// User directory database settings
    pub database: DatabaseConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Global request timeout (seconds)
    pub request_timeout_secs: u64,
}

/// Signing configuration. Built once at startup, read-only afterwards.
#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// Symmetric signing secret
    #[serde(deserialize_with = "deserialize_secret")]
    pub secret_key: SecretString,
    /// MAC algorithm
    pub algorithm: SigningAlgorithm,
    /// Default access-token lifetime (minutes)
    pub token_ttl_minutes: i64,
    /// Bound on each directory call (milliseconds)
    pub directory_timeout_ms: u64,
    /// Re-check the token subject against the directory on every request
    #[serde(default)]
    pub revalidate_subject: bool,
}

impl AuthSettings {
    /// Settings with the built-in defaults and the given secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret.into().into_boxed_str()),
            algorithm: SigningAlgorithm::default(),
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            directory_timeout_ms: DEFAULT_DIRECTORY_TIMEOUT_MS,
            revalidate_subject: false,
        }
    }

    /// Default token lifetime in seconds.
    pub fn token_ttl_secs(&self) -> i64 {
        self.token_ttl_minutes * 60
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.directory_timeout_ms)
    }

    /// Whether the non-production fallback secret is in use.
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key.expose_secret() == DEFAULT_SECRET_KEY
    }
}

/// User directory database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL. Without one the service starts with an empty in-memory directory.
    #[serde(default)]
    pub url: Option<String>,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Connect/acquire timeout (seconds)
    pub connect_timeout_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: String,
    /// Output format (pretty, json, compact)
    pub format: String,
}

fn deserialize_secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(SecretString::new(raw.into_boxed_str()))
}

impl AppConfig {
    /// Load from `path` (optional file) and the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = Self::defaults()?
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("CLINIC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("auth.secret_key", std::env::var("SECRET_KEY").ok())?
            .set_override_option("auth.algorithm", std::env::var("ALGORITHM").ok())?
            .set_override_option(
                "auth.token_ttl_minutes",
                std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES").ok(),
            )?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("logging.format", std::env::var("LOG_FORMAT").ok())?;

        Self::build(builder)
    }

    /// Load from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load("config/default.toml")
    }

    /// Parse a TOML document layered over the defaults, without consulting the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let builder =
            Self::defaults()?.add_source(config::File::from_str(toml, config::FileFormat::Toml));
        Self::build(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("environment", "development")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("auth.secret_key", DEFAULT_SECRET_KEY)?
            .set_default("auth.algorithm", "HS256")?
            .set_default("auth.token_ttl_minutes", DEFAULT_TOKEN_TTL_MINUTES)?
            .set_default("auth.directory_timeout_ms", DEFAULT_DIRECTORY_TIMEOUT_MS as i64)?
            .set_default("auth.revalidate_subject", false)?
            .set_default("database.max_connections", 10)?
            .set_default("database.connect_timeout_secs", 5)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the guard cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.token_ttl_minutes <= 0 {
            return Err(ConfigError::Message(format!(
                "auth.token_ttl_minutes must be positive, got {}",
                self.auth.token_ttl_minutes
            )));
        }
        if self.auth.token_ttl_minutes > MAX_TOKEN_TTL_MINUTES {
            return Err(ConfigError::Message(format!(
                "auth.token_ttl_minutes must be at most {}, got {}",
                MAX_TOKEN_TTL_MINUTES, self.auth.token_ttl_minutes
            )));
        }
        if self.auth.directory_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "auth.directory_timeout_ms must be positive".to_string(),
            ));
        }
        if self.auth.secret_key.expose_secret().is_empty() {
            return Err(ConfigError::Message(
                "auth.secret_key must not be empty".to_string(),
            ));
        }
        if self.environment == Environment::Production && self.auth.uses_default_secret() {
            return Err(ConfigError::Message(
                "the default signing secret cannot be used in production; set SECRET_KEY"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
