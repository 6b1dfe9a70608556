//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Binance aggregate trade stream adapters (transport, codec, keepalive, reconnect).
pub mod binance;

/// Configuration loaded from the environment.
pub mod config;

/// Console trade table.
pub mod console;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Channel hand-off event sink.
pub mod sink;

/// Observable stream status.
pub mod status;

/// OpenTelemetry tracing integration.
pub mod telemetry;
