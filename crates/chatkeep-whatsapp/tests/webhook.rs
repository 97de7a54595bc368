// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook routes driven through the router against the test harness.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use chatkeep_core::BufferStore;
use chatkeep_core::types::ConversationKey;
use chatkeep_test_utils::TestHarness;
use chatkeep_whatsapp::{ServerConfig, WebhookState, router, start_server};

fn message(text: &str) -> Value {
    json!({
        "event": "messages.upsert",
        "instance": "shop",
        "data": {
            "key": {"remoteJid": "5511999990000@s.whatsapp.net", "fromMe": false},
            "message": {"conversation": text}
        }
    })
}

async fn post(app: axum::Router, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn text_message_is_buffered() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(WebhookState::new(h.coordinator.clone()));

    let (status, body) = post(app.clone(), &message("Hello")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "buffered");
    let first = body["last_update"].as_i64().unwrap();

    let (status, body) = post(app, &message("World")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body["last_update"].as_i64().unwrap() > first);

    let key = ConversationKey::new("shop", "5511999990000");
    let stored = h.buffer.get_buffer(&key).await.unwrap().unwrap();
    assert_eq!(stored.text, "Hello World");

    let mock = h.mock_execution.clone().unwrap();
    assert_eq!(mock.started().await.len(), 2);
    assert_eq!(mock.cancelled().await.len(), 1);
}

#[tokio::test]
async fn own_message_is_ignored() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(WebhookState::new(h.coordinator.clone()));

    let mut event = message("bot reply");
    event["data"]["key"]["fromMe"] = json!(true);
    let (status, body) = post(app, &event).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ignored", "reason": "from_me"}));
    assert!(h.mock_execution.clone().unwrap().started().await.is_empty());
}

#[tokio::test]
async fn store_or_execution_failure_is_500() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(WebhookState::new(h.coordinator.clone()));
    h.mock_execution.clone().unwrap().fail_starts(1).await;

    let (status, body) = post(app, &message("Hello")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn health_reports_ok() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(WebhookState::new(h.coordinator.clone()));

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn server_stops_on_cancellation() {
    let h = TestHarness::builder().build().await.unwrap();
    let shutdown = CancellationToken::new();
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let state = WebhookState::new(h.coordinator.clone());
    let token = shutdown.clone();
    let server = tokio::spawn(async move { start_server(&config, state, token).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stopped")
        .unwrap();
    assert!(result.is_ok());
}
