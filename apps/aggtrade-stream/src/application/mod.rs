//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the connection lifecycle and client facade, and
//! the port interfaces that define how they reach external systems.

/// Port interfaces for external systems (transport, decoder, sink, etc.).
pub mod ports;

/// Connection lifecycle state machine and the stream client facade.
pub mod services;
