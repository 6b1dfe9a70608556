//! Domain Layer - Core trade stream types.
//!
//! This layer contains the value types shared by every other layer:
//! subscription keys, decoded trades, and connection lifecycle states.
//! Nothing here performs I/O.

/// Connection lifecycle states and close descriptions.
pub mod connection;

/// Subscription keys, trade events, and decode errors.
pub mod trade;
