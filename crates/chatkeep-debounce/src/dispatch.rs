// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP hand-off of coalesced turns to the conversation processor.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use chatkeep_core::types::ConversationTurn;
use chatkeep_core::{ChatkeepError, ConversationDispatcher};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body POSTed to the processor.
#[derive(Debug, Serialize)]
struct ProcessRequest<'a> {
    instance: &'a str,
    phone_number: &'a str,
    message: &'a str,
    last_update: i64,
    thread_id: String,
}

impl<'a> From<&'a ConversationTurn> for ProcessRequest<'a> {
    fn from(turn: &'a ConversationTurn) -> Self {
        Self {
            instance: &turn.key.instance_id,
            phone_number: &turn.key.conversant_id,
            message: &turn.text,
            last_update: turn.last_update,
            thread_id: turn.key.thread_id(),
        }
    }
}

/// Dispatches each turn as a JSON POST. Any non-2xx status is an error.
pub struct HttpDispatcher {
    client: reqwest::Client,
    url: String,
}

impl HttpDispatcher {
    pub fn new(url: impl Into<String>) -> Result<Self, ChatkeepError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChatkeepError::Dispatch {
                message: "failed to build HTTP client".to_string(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ConversationDispatcher for HttpDispatcher {
    async fn dispatch(&self, turn: &ConversationTurn) -> Result<(), ChatkeepError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ProcessRequest::from(turn))
            .send()
            .await
            .map_err(|e| ChatkeepError::Dispatch {
                message: format!("request to {} failed", self.url),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatkeepError::Dispatch {
                message: format!("processor returned {status}: {body}"),
                source: None,
            });
        }
        debug!(conversation = %turn.key, %status, "processor accepted turn");
        Ok(())
    }
}
