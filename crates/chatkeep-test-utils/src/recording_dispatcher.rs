// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation dispatcher that records what it receives.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use chatkeep_core::types::ConversationTurn;
use chatkeep_core::{ChatkeepError, ConversationDispatcher};

#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    turns: Arc<Mutex<Vec<ConversationTurn>>>,
    fail_next: Arc<Mutex<Option<String>>>,
    notify: Arc<Notify>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns dispatched so far, in order.
    pub async fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.lock().await.clone()
    }

    /// Make the next dispatch fail with `message`; it is not recorded.
    pub async fn fail_next(&self, message: &str) {
        *self.fail_next.lock().await = Some(message.to_string());
    }

    /// Wait until at least `count` turns were recorded.
    pub async fn wait_for(&self, count: usize) {
        loop {
            let notified = self.notify.notified();
            if self.turns.lock().await.len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl ConversationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, turn: &ConversationTurn) -> Result<(), ChatkeepError> {
        if let Some(message) = self.fail_next.lock().await.take() {
            return Err(ChatkeepError::Dispatch {
                message,
                source: None,
            });
        }
        self.turns.lock().await.push(turn.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}
