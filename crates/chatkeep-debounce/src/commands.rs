// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maintenance commands typed into the chat by operators.
//!
//! `/clear-all` and `/amnesia` forget every conversation; `/clear-this` and
//! `/partial-amnesia` forget only the sender's. They are handled here and
//! never reach the conversation engine.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use chatkeep_core::types::ConversationTurn;
use chatkeep_core::{ChatkeepError, CheckpointSaver, ConversationDispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceCommand {
    /// Delete the checkpoints of every thread.
    ClearAll,
    /// Delete the checkpoints of the sender's thread.
    ClearThread,
}

impl MaintenanceCommand {
    /// Recognize a command, ignoring case. The whole (trimmed) message must be the command.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "/clear-all" | "/amnesia" => Some(Self::ClearAll),
            "/clear-this" | "/partial-amnesia" => Some(Self::ClearThread),
            _ => None,
        }
    }
}

/// Runs maintenance commands against the checkpoint saver, delegates everything else.
pub struct CommandDispatcher {
    saver: Arc<dyn CheckpointSaver>,
    inner: Arc<dyn ConversationDispatcher>,
}

impl CommandDispatcher {
    pub fn new(saver: Arc<dyn CheckpointSaver>, inner: Arc<dyn ConversationDispatcher>) -> Self {
        Self { saver, inner }
    }
}

#[async_trait]
impl ConversationDispatcher for CommandDispatcher {
    async fn dispatch(&self, turn: &ConversationTurn) -> Result<(), ChatkeepError> {
        match MaintenanceCommand::parse(&turn.text) {
            Some(MaintenanceCommand::ClearAll) => {
                let removed = self.saver.clear().await?;
                info!(conversation = %turn.key, removed, "amnesia: all threads cleared");
                Ok(())
            }
            Some(MaintenanceCommand::ClearThread) => {
                let thread_id = turn.key.thread_id();
                let removed = self.saver.delete_thread(&thread_id).await?;
                info!(%thread_id, removed, "partial amnesia: thread cleared");
                Ok(())
            }
            None => self.inner.dispatch(turn).await,
        }
    }
}
