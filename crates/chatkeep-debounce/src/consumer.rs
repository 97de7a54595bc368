// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution-completion side of the debounce state machine.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use chatkeep_core::types::{ConversationTurn, ExecutionInput};
use chatkeep_core::{BufferStore, ChatkeepError, ConversationDispatcher, ExecutionTarget};

/// What a settled execution found when it tried to claim its buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The buffer was still current; its text went to the dispatcher.
    Dispatched(ConversationTurn),
    /// A newer message arrived, or the buffer is already gone.
    Stale,
}

/// Claims the buffer a settled execution was started for and hands it on.
#[derive(Clone)]
pub struct DebounceConsumer {
    buffer: Arc<dyn BufferStore>,
    dispatcher: Arc<dyn ConversationDispatcher>,
}

impl DebounceConsumer {
    pub fn new(buffer: Arc<dyn BufferStore>, dispatcher: Arc<dyn ConversationDispatcher>) -> Self {
        Self { buffer, dispatcher }
    }

    /// Compare-and-delete the buffer on `input.last_update`, then dispatch its text.
    ///
    /// The dispatched text is the buffer's, not the input's: both are equal
    /// when `last_update` matches, and the buffer is authoritative.
    pub async fn consume(&self, input: &ExecutionInput) -> Result<ConsumeOutcome, ChatkeepError> {
        let key = input.key();
        let Some(record) = self
            .buffer
            .take_if_current(&key, input.last_update)
            .await?
        else {
            debug!(
                conversation = %key,
                last_update = input.last_update,
                "stale execution, buffer moved on"
            );
            return Ok(ConsumeOutcome::Stale);
        };

        let turn = ConversationTurn {
            key,
            text: record.text,
            last_update: record.last_update,
        };
        self.dispatcher.dispatch(&turn).await?;
        info!(
            conversation = %turn.key,
            last_update = turn.last_update,
            "conversation turn dispatched"
        );
        Ok(ConsumeOutcome::Dispatched(turn))
    }
}

#[async_trait]
impl ExecutionTarget for DebounceConsumer {
    async fn run(&self, input: ExecutionInput) -> Result<(), ChatkeepError> {
        self.consume(&input).await.map(|_| ())
    }
}
