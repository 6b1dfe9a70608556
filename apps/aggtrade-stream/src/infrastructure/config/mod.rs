//! Configuration Module
//!
//! Configuration loading for the trade stream client and its HTTP endpoints.

mod settings;

pub use settings::{ConfigError, ServerSettings, StreamConfig, WebSocketSettings};
