#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Aggregate Trade Stream - Resilient Market Data Client
//!
//! Maintains one long-lived WebSocket connection to an exchange's aggregate
//! trade stream, answers keepalive probes, reconnects after any closure, and
//! hands decoded trades to a sink.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core types with no I/O
//!   - `trade`: Subscription key, trade event, decode error
//!   - `connection`: Connection state machine and close info
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Transport, decoder, keepalive, reconnect policy, event sink
//!   - `services`: Connection lifecycle and the `StreamClient` facade
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `binance`: WebSocket transport, JSON codec, keepalive, reconnect policy
//!   - `sink`, `status`, `console`: Event hand-off and presentation
//!   - `health`: HTTP endpoints
//!   - `config`, `metrics`, `telemetry`: Ambient concerns
//!
//! # Data Flow
//!
//! ```text
//! Exchange WS --> Lifecycle --> WireDecoder --> EventSink --> mpsc --> console / status
//!                   ^    |
//!                   |    +--> KeepaliveResponder (ping -> pong)
//!                   +-------- ReconnectPolicy (close -> delay)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core stream types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::{CloseInfo, ConnectionState};
pub use domain::trade::{
    DecodeError, DecodeErrorKind, SubscriptionKey, SubscriptionKeyError, TradeEvent,
};

// Ports
pub use application::ports::{
    Connection, Connector, EventSink, Frame, KeepaliveResponder, ReconnectPolicy, TransportError,
    WireDecoder,
};

// Client facade
pub use application::services::{
    ClientError, DEFAULT_ENDPOINT, StreamClient, StreamClientConfig, StreamComponents,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, ServerSettings, StreamConfig, WebSocketSettings};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Sinks
pub use infrastructure::console::TradeTable;
pub use infrastructure::sink::{ChannelSink, StreamEvent};
pub use infrastructure::status::{StatusSnapshot, StreamStatus};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
