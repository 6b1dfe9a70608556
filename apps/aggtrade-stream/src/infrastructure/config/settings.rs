//! Stream Configuration Settings
//!
//! Configuration types for the trade stream, loaded from environment variables.

use std::time::Duration;

use crate::application::services::{DEFAULT_ENDPOINT, StreamClientConfig};

/// WebSocket connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Base stream endpoint.
    pub endpoint: String,
    /// Delay between a close and the next connection attempt.
    pub reconnect_delay: Duration,
    /// Idle timeout before the connection is considered dead (zero = disabled).
    pub idle_timeout: Duration,
    /// Maximum wait for the close handshake on shutdown.
    pub close_timeout: Duration,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            reconnect_delay: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            close_timeout: Duration::from_secs(5),
        }
    }
}

impl WebSocketSettings {
    /// Client configuration derived from these settings.
    #[must_use]
    pub fn client_config(&self) -> StreamClientConfig {
        StreamClientConfig {
            endpoint: self.endpoint.clone(),
            idle_timeout: (!self.idle_timeout.is_zero()).then_some(self.idle_timeout),
            close_timeout: self.close_timeout,
        }
    }
}

/// Server and output settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP port for the health endpoints.
    pub http_port: u16,
    /// Capacity of the event hand-off channel.
    pub event_buffer: usize,
    /// Whether trades are rendered to stdout.
    pub console: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 3000,
            event_buffer: 1024,
            console: true,
        }
    }
}

/// Complete stream configuration.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Subscription key from the environment; prompted for when absent.
    pub symbol: Option<String>,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
    /// Server and output settings.
    pub server: ServerSettings,
}

impl StreamConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but unusable (an empty
    /// endpoint, a zero reconnect delay, or a zero event buffer).
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint =
            std::env::var("TRADE_STREAM_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        if endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyValue("TRADE_STREAM_ENDPOINT".to_string()));
        }

        let symbol = std::env::var("TRADE_STREAM_SYMBOL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let websocket = WebSocketSettings {
            endpoint,
            reconnect_delay: parse_env_duration_millis(
                "TRADE_STREAM_RECONNECT_DELAY_MS",
                WebSocketSettings::default().reconnect_delay,
            ),
            idle_timeout: parse_env_duration_secs(
                "TRADE_STREAM_IDLE_TIMEOUT_SECS",
                WebSocketSettings::default().idle_timeout,
            ),
            close_timeout: parse_env_duration_secs(
                "TRADE_STREAM_CLOSE_TIMEOUT_SECS",
                WebSocketSettings::default().close_timeout,
            ),
        };

        let server = ServerSettings {
            http_port: parse_env_u16("TRADE_STREAM_HTTP_PORT", ServerSettings::default().http_port),
            event_buffer: parse_env_usize(
                "TRADE_STREAM_EVENT_BUFFER",
                ServerSettings::default().event_buffer,
            ),
            console: parse_env_bool("TRADE_STREAM_CONSOLE", ServerSettings::default().console),
        };

        let config = Self {
            symbol,
            websocket,
            server,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the client misbehave.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero reconnect delay or a
    /// zero event buffer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.websocket.reconnect_delay.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "TRADE_STREAM_RECONNECT_DELAY_MS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.server.event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TRADE_STREAM_EVENT_BUFFER".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has an unusable value.
    #[error("environment variable {key} is invalid: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
