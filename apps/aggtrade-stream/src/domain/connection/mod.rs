//! Connection Lifecycle Types
//!
//! The connection state value owned by each stream client and the
//! description of how a connection ended.

use std::fmt;

use serde::Serialize;

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close frame carried no status code.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Connection dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of a stream client's connection.
///
/// `Idle → Connecting → Open → Closing → Closed`, plus `Reconnecting`, which
/// is only entered from `Closed` while no shutdown has been requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No connection and no pending reconnect.
    #[default]
    Idle,
    /// Physical connection attempt in progress.
    Connecting,
    /// Connection established and receiving frames.
    Open,
    /// Shutdown requested, close handshake in progress.
    Closing,
    /// Connection ended; reconnect decision pending.
    Closed,
    /// Waiting for the reconnect timer.
    Reconnecting,
}

impl ConnectionState {
    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle | Self::Reconnecting, Self::Connecting)
                | (Self::Connecting, Self::Open)
                | (Self::Connecting | Self::Open, Self::Closed | Self::Closing)
                | (Self::Closed, Self::Reconnecting)
                | (Self::Closed | Self::Closing | Self::Reconnecting, Self::Idle)
        )
    }

    /// Lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Close Info
// =============================================================================

/// How a connection ended: a WebSocket close code and reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseInfo {
    /// Close code (RFC 6455 §7.4).
    pub code: u16,
    /// Close reason text, possibly empty.
    pub reason: String,
}

impl CloseInfo {
    /// Create close info from a code and reason.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Connection lost without a close handshake.
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(CLOSE_ABNORMAL, reason)
    }

    /// Remote sent a close frame without a status code.
    #[must_use]
    pub fn no_status() -> Self {
        Self::new(CLOSE_NO_STATUS, "")
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code, self.reason)
    }
}
