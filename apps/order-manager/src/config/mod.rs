//! Configuration module for the order manager.
//!
//! Loads a YAML file, interpolates environment variables and validates the
//! result. Every section has defaults, so a file only needs the values it
//! changes.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_manager::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! println!("workers: {}", config.execution.worker_count);
//! ```

mod exchange;
mod execution;
mod messaging;
mod observability;
mod outbox;
mod persistence;
mod server;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use exchange::{ExchangeConfig, ExchangeMode};
pub use execution::ExecutionConfig;
pub use messaging::{MessagingConfig, PublisherBackend};
pub use observability::{LogFormat, LoggingConfig, MetricsSettings, ObservabilityConfig};
pub use outbox::{OutboxConfig, RelayTrigger};
pub use persistence::{PersistenceConfig, StoreBackend};
pub use server::ServerConfig;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Order store configuration.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Event bus configuration.
    #[serde(default)]
    pub messaging: MessagingConfig,
    /// Exchange client configuration.
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Worker pool configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Outbox relay configuration.
    #[serde(default)]
    pub outbox: OutboxConfig,
    /// Logging and metrics configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl OutboxConfig {
    /// Relay interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// `path` defaults to [`DEFAULT_CONFIG_PATH`].
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);

    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };

    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. A variable that is
/// unset or empty takes the default, or the empty string without one.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.execution.worker_count == 0 {
        return Err(ConfigError::ValidationError(
            "execution.worker_count must be at least 1".to_string(),
        ));
    }

    if config.execution.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "execution.queue_capacity must be at least 1".to_string(),
        ));
    }

    if config.outbox.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "outbox.batch_size must be at least 1".to_string(),
        ));
    }

    if config.outbox.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "outbox.poll_interval_ms must be positive".to_string(),
        ));
    }

    if config.messaging.events_topic.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "messaging.events_topic must not be empty".to_string(),
        ));
    }

    if config.exchange.mode == ExchangeMode::BinanceTestnet
        && (config.exchange.api_key.is_empty() || config.exchange.api_secret.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "exchange.api_key and exchange.api_secret are required for binance_testnet".to_string(),
        ));
    }

    if config.persistence.backend == StoreBackend::Sqlite && !cfg!(feature = "sqlite") {
        return Err(ConfigError::ValidationError(
            "persistence.backend sqlite requires the 'sqlite' feature".to_string(),
        ));
    }

    if config.messaging.backend == PublisherBackend::Kafka {
        if !cfg!(feature = "kafka") {
            return Err(ConfigError::ValidationError(
                "messaging.backend kafka requires the 'kafka' feature".to_string(),
            ));
        }
        if config.messaging.brokers.is_empty() {
            return Err(ConfigError::ValidationError(
                "messaging.brokers must list at least one broker for kafka".to_string(),
            ));
        }
        if config.messaging.topic_partitions < 1 || config.messaging.topic_replication < 1 {
            return Err(ConfigError::ValidationError(
                "messaging.topic_partitions and messaging.topic_replication must be at least 1"
                    .to_string(),
            ));
        }
    }

    if config
        .server
        .bind_address
        .parse::<std::net::IpAddr>()
        .is_err()
    {
        return Err(ConfigError::ValidationError(format!(
            "server.bind_address '{}' is not an IP address",
            config.server.bind_address
        )));
    }

    if config.observability.metrics.enabled
        && config
            .observability
            .metrics
            .listen_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        return Err(ConfigError::ValidationError(format!(
            "observability.metrics.listen_address '{}' is not a socket address",
            config.observability.metrics.listen_address
        )));
    }

    Ok(())
}
