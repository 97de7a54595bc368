// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.

use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use chatkeep_core::ChatkeepError;
use chatkeep_debounce::DebounceCoordinator;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub coordinator: DebounceCoordinator,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

impl WebhookState {
    pub fn new(coordinator: DebounceCoordinator) -> Self {
        Self {
            coordinator,
            start_time: Instant::now(),
        }
    }
}

/// Webhook server configuration (mirrors `GatewayConfig` from chatkeep-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Routes:
/// - POST /webhook
/// - GET /health
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(handlers::post_webhook))
        .route("/health", get(handlers::get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` is cancelled; in-flight requests are drained.
pub async fn start_server(
    config: &ServerConfig,
    state: WebhookState,
    shutdown: CancellationToken,
) -> Result<(), ChatkeepError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ChatkeepError::Internal(format!("failed to bind webhook server to {addr}: {e}")))?;

    tracing::info!("webhook server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ChatkeepError::Internal(format!("webhook server error: {e}")))?;

    tracing::info!("webhook server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}
