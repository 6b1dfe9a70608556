//! Health Check and Metrics Endpoint
//!
//! HTTP collaborator that runs beside the trade stream.
//!
//! # Endpoints
//!
//! - `GET /` - Plain-text greeting
//! - `GET /health` - Process start time as `{"message", "statusCode"}`
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (ready while the stream is open)
//! - `GET /status` - Stream status snapshot as JSON
//! - `GET /metrics` - Prometheus metrics in text format
//!
//! Unmatched routes answer `404 {"message": "Not Found", "ok": false}`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::status::StreamStatus;

// =============================================================================
// Response Types
// =============================================================================

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Process start time, ISO-8601.
    pub message: String,
    /// Always 200.
    pub status_code: u16,
}

/// Body of unmatched routes.
#[derive(Debug, Clone, Serialize)]
pub struct NotFoundResponse {
    /// Always "Not Found".
    pub message: &'static str,
    /// Always false.
    pub ok: bool,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
#[derive(Debug)]
pub struct HealthServerState {
    started_at: DateTime<Utc>,
    status: Arc<StreamStatus>,
}

impl HealthServerState {
    /// Create state stamped with the current time.
    #[must_use]
    pub fn new(status: Arc<StreamStatus>) -> Self {
        Self::with_start_time(Utc::now(), status)
    }

    /// Create state with an explicit start time.
    #[must_use]
    pub const fn with_start_time(started_at: DateTime<Utc>, status: Arc<StreamStatus>) -> Self {
        Self { started_at, status }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

/// Build the router with all routes, the 404 fallback and request logging.
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn root_handler() -> &'static str {
    "Hello World!"
}

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        message: state
            .started_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        status_code: StatusCode::OK.as_u16(),
    })
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.status.is_open() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn status_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    Json(state.status.snapshot())
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            message: "Not Found",
            ok: false,
        }),
    )
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis(),
        "HTTP request"
    );
    response
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
