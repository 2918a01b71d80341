use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const ENV_PREFIX: &str = "STOREFRONT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Environment variable missing: {name}")]
    MissingEnvironmentVariable { name: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Mount the destructive `/api/admin/*` routes. Off unless
    /// `STOREFRONT_ENABLE_ADMIN=true`.
    #[serde(default)]
    pub enable_admin: bool,
}

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "database_url", default)]
    pub url: String,
    #[serde(rename = "db_max_connections", default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(rename = "db_min_connections", default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(
        rename = "db_acquire_timeout_seconds",
        default = "default_acquire_timeout"
    )]
    pub acquire_timeout_seconds: u64,
    #[serde(default = "default_run_schema_setup")]
    pub run_schema_setup: bool,
}

// The URL carries credentials, so it stays out of debug output.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_seconds", &self.acquire_timeout_seconds)
            .field("run_schema_setup", &self.run_schema_setup)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

impl Config {
    pub fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");

        let config = Config {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            observability: ObservabilityConfig::from_env()?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Request timeout cannot be 0".to_string(),
            });
        }

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingEnvironmentVariable {
                name: format!("{}_DATABASE_URL", ENV_PREFIX),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError {
                message: "Database pool needs at least one connection".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Minimum connections ({}) exceed maximum connections ({})",
                    self.database.min_connections, self.database.max_connections
                ),
            });
        }

        Ok(())
    }
}

/// Deserialize one configuration section from `STOREFRONT_*` variables
fn load_section<T: DeserializeOwned>(section: &str) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("server")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("database")
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

impl ObservabilityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        load_section("observability")
    }

    /// The OTLP endpoint, ignoring blank values
    pub fn otlp_endpoint(&self) -> Option<&str> {
        self.otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    3000
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

pub(crate) fn default_static_dir() -> String {
    "static".to_string()
}

pub(crate) fn default_max_connections() -> u32 {
    10
}

pub(crate) fn default_min_connections() -> u32 {
    1
}

pub(crate) fn default_acquire_timeout() -> u64 {
    5
}

pub(crate) fn default_run_schema_setup() -> bool {
    true
}

pub(crate) fn default_service_name() -> String {
    "storefront-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests;
