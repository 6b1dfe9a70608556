//! Reconnection Policy
//!
//! Fixed-delay reconnection for a single always-on stream. Every close is
//! retried after the same delay, whatever the close code, unless shutdown has
//! been requested. The policy holds no mutable state, so the same inputs
//! always produce the same answer.

use std::time::Duration;

use crate::application::ports::ReconnectPolicy;

/// Default delay between a close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Reconnect after a constant, non-zero delay.
///
/// # Example
///
/// ```rust
/// use aggtrade_stream::application::ports::ReconnectPolicy;
/// use aggtrade_stream::infrastructure::binance::reconnect::FixedDelayPolicy;
/// use std::time::Duration;
///
/// let policy = FixedDelayPolicy::default();
/// assert_eq!(policy.next_delay(1006, "", false), Some(Duration::from_secs(5)));
/// assert_eq!(policy.next_delay(1006, "", true), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelayPolicy {
    delay: Duration,
}

impl Default for FixedDelayPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl FixedDelayPolicy {
    /// Create a policy with a custom delay.
    ///
    /// # Errors
    ///
    /// Returns `ReconnectError::ZeroDelay` for a zero delay, which would
    /// hot-loop against the venue on persistent failures.
    pub const fn new(delay: Duration) -> Result<Self, ReconnectError> {
        if delay.is_zero() {
            return Err(ReconnectError::ZeroDelay);
        }
        Ok(Self { delay })
    }

    /// Create configuration from `WebSocketSettings`.
    ///
    /// # Errors
    ///
    /// Returns `ReconnectError::ZeroDelay` if the configured delay is zero.
    pub const fn from_websocket_settings(
        settings: &crate::WebSocketSettings,
    ) -> Result<Self, ReconnectError> {
        Self::new(settings.reconnect_delay)
    }

    /// The configured delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl ReconnectPolicy for FixedDelayPolicy {
    fn next_delay(&self, _code: u16, _reason: &str, shutdown_requested: bool) -> Option<Duration> {
        if shutdown_requested {
            return None;
        }
        Some(self.delay)
    }
}

/// Error type for reconnection policy construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconnectError {
    /// A zero delay was requested.
    #[error("reconnect delay must be greater than zero")]
    ZeroDelay,
}
