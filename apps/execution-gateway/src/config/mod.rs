//! Configuration module for the execution gateway.
//!
//! Loads YAML configuration with environment variable interpolation and
//! validates it before any socket is bound.
//!
//! # Usage
//!
//! ```rust,ignore
//! use execution_gateway::config::{Config, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! println!("commands port: {}", config.server.commands_port);
//! ```

mod observability;
mod server;
mod throttling;
mod wire;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::services::MAX_THROTTLE_INTERVAL;

pub use observability::{LoggingConfig, MetricsSettings, ObservabilityConfig};
pub use server::ServerConfig;
pub use throttling::ThrottlingConfig;
pub use wire::{EncryptionConfig, WireConfig};

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
    /// Socket configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Command throttling limits.
    #[serde(default)]
    pub throttling: ThrottlingConfig,
    /// Wire format.
    #[serde(default)]
    pub wire: WireConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
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
        match cap.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(v)) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` naming the first offending field.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let server = &config.server;

    if server.commands_port == 0 || server.events_port == 0 {
        return Err(ConfigError::ValidationError(
            "commands_port and events_port must be non-zero".to_string(),
        ));
    }

    if server.commands_port == server.events_port {
        return Err(ConfigError::ValidationError(
            "commands_port and events_port must be different".to_string(),
        ));
    }

    if server.bind_ip().is_err() {
        return Err(ConfigError::ValidationError(format!(
            "bind_address '{}' is not an IP address",
            server.bind_address
        )));
    }

    if server.max_frame_size == 0 || server.mailbox_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "max_frame_size and mailbox_capacity must be positive".to_string(),
        ));
    }

    let throttling = &config.throttling;
    if throttling.commands_per_second == 0 || throttling.new_orders_per_second == 0 {
        return Err(ConfigError::ValidationError(
            "commands_per_second and new_orders_per_second must be positive".to_string(),
        ));
    }

    if throttling.interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "interval_ms must be positive".to_string(),
        ));
    }

    if throttling.interval() > MAX_THROTTLE_INTERVAL {
        return Err(ConfigError::ValidationError(format!(
            "interval_ms must not exceed {}",
            MAX_THROTTLE_INTERVAL.as_millis()
        )));
    }

    if throttling.new_orders_per_second > throttling.commands_per_second {
        return Err(ConfigError::ValidationError(
            "new_orders_per_second must not exceed commands_per_second".to_string(),
        ));
    }

    let encryption = &config.wire.encryption;
    if encryption.enabled {
        let key = encryption.key_hex.trim();
        if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::ValidationError(
                "encryption.key_hex must be 64 hex characters".to_string(),
            ));
        }
    }

    if config.observability.metrics.enabled
        && config
            .observability
            .metrics
            .listen_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        return Err(ConfigError::ValidationError(
            "metrics.listen_addr must be a socket address".to_string(),
        ));
    }

    Ok(())
}
