//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `lifecycle`: Connection state machine that owns the physical connection
//! - `client`: `StreamClient` facade exposing `start` / `stop`

pub mod client;
pub mod lifecycle;

pub use client::{ClientError, DEFAULT_ENDPOINT, StreamClient, StreamClientConfig};
pub use lifecycle::StreamComponents;
