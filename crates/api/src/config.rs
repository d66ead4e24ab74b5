use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

/// Where webhook state is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps. Everything is lost on restart.
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Outbound delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Bound on a single outbound HTTP request.
    #[serde(default = "default_delivery_timeout")]
    pub request_timeout_secs: u64,

    /// Attempt budget for regular deliveries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Maximum number of outbound requests in flight.
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    #[serde(default = "default_retry_scan_interval")]
    pub retry_scan_interval_secs: u64,

    /// Maximum number of due retries claimed per scan.
    #[serde(default = "default_retry_batch_size")]
    pub retry_batch_size: usize,

    #[serde(default = "default_require_https")]
    pub require_https: bool,

    /// Delivery log entries older than this are purged daily. 0 keeps them forever.
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_storage_backend() -> StorageBackend {
    StorageBackend::Memory
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_delivery_timeout() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    5
}
fn default_worker_concurrency() -> usize {
    16
}
fn default_retry_scan_interval() -> u64 {
    30
}
fn default_retry_batch_size() -> usize {
    100
}
fn default_require_https() -> bool {
    true
}
fn default_log_retention_days() -> u32 {
    30
}
fn default_user_agent() -> String {
    format!("homeservices-webhooks/{}", env!("CARGO_PKG_VERSION"))
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with HS__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("HS").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Defaults are embedded so tests do not depend on the working directory.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [storage]
            backend = "memory"

            [logging]
            level = "info"
            format = "json"

            [delivery]
            request_timeout_secs = 30
            max_attempts = 5
            worker_concurrency = 16
            retry_scan_interval_secs = 30
            retry_batch_size = 100
            require_https = true
            log_retention_days = 30
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "HS__DATABASE__URL must be set when storage.backend is postgres".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.delivery.worker_concurrency == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "delivery.worker_concurrency must be at least 1".to_string(),
            ));
        }

        if self.delivery.max_attempts == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "delivery.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.delivery.request_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "delivery.request_timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.delivery.retry_scan_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "delivery.retry_scan_interval_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| {
                ConfigValidationError::InvalidValue(format!(
                    "Invalid socket address {}:{}",
                    self.server.host, self.server.port
                ))
            })
    }
}
