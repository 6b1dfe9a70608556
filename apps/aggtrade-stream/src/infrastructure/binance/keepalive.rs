//! Keepalive Responder
//!
//! Binance sends a ping frame periodically and closes the connection if no
//! matching pong is observed in time. The responder builds that pong, echoing
//! the ping payload byte for byte.
//!
//! The lifecycle writes the pong before reading the next frame, so an
//! acknowledgment is never queued behind data frames.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::ports::{Frame, KeepaliveResponder};
use crate::infrastructure::metrics;

/// Answers pings with pongs carrying identical payload bytes.
#[derive(Debug, Default)]
pub struct PongResponder {
    acknowledged: AtomicU64,
}

impl PongResponder {
    /// Create a new responder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            acknowledged: AtomicU64::new(0),
        }
    }

    /// Number of probes acknowledged so far.
    #[must_use]
    pub fn acknowledged(&self) -> u64 {
        self.acknowledged.load(Ordering::Relaxed)
    }
}

impl KeepaliveResponder for PongResponder {
    fn acknowledge(&self, payload: &[u8]) -> Frame {
        self.acknowledged.fetch_add(1, Ordering::Relaxed);
        metrics::record_keepalive_ack();
        Frame::Pong(payload.to_vec())
    }
}
