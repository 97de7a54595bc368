// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook API.
//!
//! Handles POST /webhook and GET /health.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::server::WebhookState;
use crate::webhook::EvolutionEvent;

/// Response body for POST /webhook.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookResponse {
    /// The text was appended and a debounce execution is pending.
    Buffered { last_update: i64 },
    /// The event carried nothing to buffer.
    Ignored { reason: String },
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// POST /webhook
///
/// Buffers the message text and (re)starts the debounce execution for its
/// conversation. Responds 202 once buffered, 200 for ignored events and 500
/// when the buffer store or execution service fails.
pub async fn post_webhook(
    State(state): State<WebhookState>,
    Json(event): Json<EvolutionEvent>,
) -> Response {
    let inbound = match event.inbound_text() {
        Ok(inbound) => inbound,
        Err(reason) => {
            debug!(event = ?event.event, %reason, "webhook event ignored");
            return (
                StatusCode::OK,
                Json(WebhookResponse::Ignored {
                    reason: reason.to_string(),
                }),
            )
                .into_response();
        }
    };

    match state.coordinator.receive(&inbound.key, &inbound.text).await {
        Ok(record) => {
            info!(
                conversation = %inbound.key,
                last_update = record.last_update,
                "message received"
            );
            (
                StatusCode::ACCEPTED,
                Json(WebhookResponse::Buffered {
                    last_update: record.last_update,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(conversation = %inbound.key, error = %e, "failed to buffer message");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal server error".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<WebhookState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn webhook_response_shapes() {
        let buffered = serde_json::to_value(WebhookResponse::Buffered { last_update: 105 }).unwrap();
        assert_eq!(buffered, json!({"status": "buffered", "last_update": 105}));

        let ignored = serde_json::to_value(WebhookResponse::Ignored {
            reason: "from_me".into(),
        })
        .unwrap();
        assert_eq!(ignored, json!({"status": "ignored", "reason": "from_me"}));
    }
}
