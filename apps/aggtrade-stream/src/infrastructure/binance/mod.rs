//! Binance WebSocket Adapters
//!
//! Implements the driven ports for Binance's raw aggregate trade stream:
//!
//! - **Messages / Codec**: aggregate trade wire type and JSON decoder
//! - **Keepalive**: pong responder for server pings
//! - **Reconnect**: fixed-delay reconnection policy
//! - **Transport**: `tokio-tungstenite` connector

pub mod codec;
pub mod keepalive;
pub mod messages;
pub mod reconnect;
pub mod transport;

pub use codec::AggTradeCodec;
pub use keepalive::PongResponder;
pub use messages::{AGG_TRADE_EVENT, AggTradeMessage};
pub use reconnect::{DEFAULT_RECONNECT_DELAY, FixedDelayPolicy, ReconnectError};
pub use transport::{TungsteniteConnection, TungsteniteConnector};
