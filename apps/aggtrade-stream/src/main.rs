//! Aggregate Trade Stream Binary
//!
//! Prompts for a base asset (or reads it from the environment), streams its
//! aggregate trades against USDT to the console, and serves health endpoints
//! until interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin aggtrade-stream
//! ```
//!
//! # Environment Variables
//!
//! - `TRADE_STREAM_ENDPOINT`: Stream base URL (default: wss://stream.binance.com:9443/ws)
//! - `TRADE_STREAM_SYMBOL`: Base asset, skips the prompt (e.g. "btc")
//! - `TRADE_STREAM_RECONNECT_DELAY_MS`: Delay before reconnecting (default: 5000)
//! - `TRADE_STREAM_IDLE_TIMEOUT_SECS`: Silence before the connection is dropped, 0 disables (default: 600)
//! - `TRADE_STREAM_CLOSE_TIMEOUT_SECS`: Close handshake limit on shutdown (default: 5)
//! - `TRADE_STREAM_EVENT_BUFFER`: Event channel capacity (default: 1024)
//! - `TRADE_STREAM_HTTP_PORT`: Health HTTP port (default: 3000)
//! - `TRADE_STREAM_CONSOLE`: Render trades to stdout (default: true)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log level (default: info)

use std::io::{Stdout, Write};
use std::sync::Arc;

use aggtrade_stream::infrastructure::binance::{
    AggTradeCodec, FixedDelayPolicy, PongResponder, TungsteniteConnector,
};
use aggtrade_stream::infrastructure::health::{HealthServer, HealthServerState};
use aggtrade_stream::infrastructure::telemetry;
use aggtrade_stream::{
    ChannelSink, StreamClient, StreamComponents, StreamConfig, StreamEvent, StreamStatus,
    SubscriptionKey, TradeTable, init_metrics,
};
use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Prompt shown when no symbol is configured.
const SYMBOL_PROMPT: &str = "Input crypto name? ";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    // Initialize telemetry (tracing + optional OTLP export)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting aggregate trade stream");

    let _metrics_handle = init_metrics();

    let config = StreamConfig::from_env()?;
    log_config(&config);

    let key = match config.symbol.as_deref() {
        Some(symbol) => SubscriptionKey::parse(symbol)?,
        None => prompt_for_key().await?,
    };

    let shutdown_token = CancellationToken::new();
    let status = Arc::new(StreamStatus::new(key.as_str()));

    // Spawn health server
    let health_state = Arc::new(HealthServerState::new(Arc::clone(&status)));
    let health_server = HealthServer::new(
        config.server.http_port,
        health_state,
        shutdown_token.clone(),
    );
    let health_task = tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    // Wire the stream client
    let (sink, events) = ChannelSink::channel(config.server.event_buffer);
    let responder = Arc::new(PongResponder::new());
    let components = StreamComponents {
        connector: Arc::new(TungsteniteConnector::new()),
        decoder: Arc::new(AggTradeCodec::new()),
        responder: Arc::<PongResponder>::clone(&responder),
        policy: Arc::new(FixedDelayPolicy::from_websocket_settings(&config.websocket)?),
        sink: Arc::new(sink),
    };
    let client = StreamClient::new(config.websocket.client_config(), components);

    let table = config.server.console.then(TradeTable::stdout);
    let event_task = tokio::spawn(handle_stream_events(events, Arc::clone(&status), table));

    client.start(key.as_str())?;
    tracing::info!(key = %key, "Trade stream client started");

    await_shutdown().await;

    client.stop().await;
    // Dropping the client releases the last sink sender, ending the event loop.
    drop(client);
    if let Err(e) = event_task.await {
        tracing::error!(error = %e, "Event handler failed");
    }

    shutdown_token.cancel();
    if let Err(e) = health_task.await {
        tracing::error!(error = %e, "Health server task failed");
    }

    tracing::info!(
        trades = status.trades_received(),
        pongs = responder.acknowledged(),
        "Aggregate trade stream stopped"
    );
    Ok(())
}

/// Ask the operator for a base asset on stdin.
async fn prompt_for_key() -> anyhow::Result<SubscriptionKey> {
    {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{SYMBOL_PROMPT}")?;
        stdout.flush()?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let line = lines
        .next_line()
        .await
        .context("failed to read symbol from stdin")?
        .context("stdin closed before a symbol was entered")?;

    Ok(SubscriptionKey::parse(&line)?)
}

/// Fold stream events into the shared status and render them.
async fn handle_stream_events(
    mut rx: mpsc::Receiver<StreamEvent>,
    status: Arc<StreamStatus>,
    mut table: Option<TradeTable<Stdout>>,
) {
    while let Some(event) = rx.recv().await {
        status.apply(&event);

        if let Some(out) = table.as_mut() {
            let rendered = match &event {
                StreamEvent::Trade(trade) => out.render_trade(trade),
                StreamEvent::Status(state) => out.render_status(*state),
                StreamEvent::DecodeFailed(_) => Ok(()),
            };
            if let Err(e) = rendered {
                tracing::warn!(error = %e, "Console output failed, disabling trade table");
                table = None;
            }
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &StreamConfig) {
    tracing::info!(
        endpoint = %config.websocket.endpoint,
        reconnect_delay_ms = config.websocket.reconnect_delay.as_millis(),
        idle_timeout_secs = config.websocket.idle_timeout.as_secs(),
        http_port = config.server.http_port,
        console = config.server.console,
        "Configuration loaded"
    );
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
