//! Prometheus Metrics Module
//!
//! Exposes stream metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Trades**: Aggregate trades received and decode failures
//! - **Connection**: Open/closed gauge, reconnects and keepalive acknowledgments
//! - **Delivery**: Events dropped when the consumer falls behind
//! - **Latency**: Exchange trade time to local receipt
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

const TRADES_RECEIVED: &str = "aggtrade_stream_trades_received_total";
const DECODE_ERRORS: &str = "aggtrade_stream_decode_errors_total";
const RECONNECTS: &str = "aggtrade_stream_reconnects_total";
const KEEPALIVE_ACKS: &str = "aggtrade_stream_keepalive_acks_total";
const EVENTS_DROPPED: &str = "aggtrade_stream_events_dropped_total";
const CONNECTION_OPEN: &str = "aggtrade_stream_connection_open";
const TRADE_LATENCY: &str = "aggtrade_stream_trade_latency_seconds";

fn register_metrics() {
    describe_counter!(TRADES_RECEIVED, "Total aggregate trades decoded");
    describe_counter!(DECODE_ERRORS, "Total data frames that failed to decode");
    describe_counter!(RECONNECTS, "Total reconnection attempts");
    describe_counter!(KEEPALIVE_ACKS, "Total pings answered with a pong");
    describe_counter!(
        EVENTS_DROPPED,
        "Total events dropped because the consumer channel was full"
    );

    describe_gauge!(CONNECTION_OPEN, "1 while the stream connection is open");

    describe_histogram!(
        TRADE_LATENCY,
        "Delay between exchange trade time and local receipt"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a decoded trade.
pub fn record_trade_received(symbol: &str) {
    counter!(TRADES_RECEIVED, "symbol" => symbol.to_string()).increment(1);
}

/// Record a payload that failed to decode.
pub fn record_decode_error(kind: &'static str) {
    counter!(DECODE_ERRORS, "kind" => kind).increment(1);
}

/// Record a scheduled reconnection.
pub fn record_reconnect() {
    counter!(RECONNECTS).increment(1);
}

/// Record a ping acknowledged with a pong.
pub fn record_keepalive_ack() {
    counter!(KEEPALIVE_ACKS).increment(1);
}

/// Record events dropped on the consumer channel.
pub fn record_events_dropped(count: u64) {
    counter!(EVENTS_DROPPED).increment(count);
}

/// Update the connection gauge.
pub fn set_connection_open(open: bool) {
    gauge!(CONNECTION_OPEN).set(if open { 1.0 } else { 0.0 });
}

/// Record the delay between trade time and receipt.
pub fn record_trade_latency(latency: Duration) {
    histogram!(TRADE_LATENCY).record(latency.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
