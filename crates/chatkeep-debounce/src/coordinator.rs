// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound side of the debounce state machine.
//!
//! Per conversation the buffer moves through
//! Idle -> Buffered -> Pending, and back to Buffered on every new message:
//! the pending execution is cancelled, the text is appended and a fresh
//! execution is started against the new `last_update`.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use chatkeep_core::types::{
    BufferRecord, CancelOutcome, ConversationKey, ExecutionHandle, ExecutionInput,
};
use chatkeep_core::{BufferStore, ChatkeepError, ExecutionService};

/// Coalesces rapid messages of one conversation into a single execution.
#[derive(Clone)]
pub struct DebounceCoordinator {
    buffer: Arc<dyn BufferStore>,
    executions: Arc<dyn ExecutionService>,
}

impl DebounceCoordinator {
    pub fn new(buffer: Arc<dyn BufferStore>, executions: Arc<dyn ExecutionService>) -> Self {
        Self { buffer, executions }
    }

    /// Buffer `text` at the current wall-clock second.
    pub async fn receive(
        &self,
        key: &ConversationKey,
        text: &str,
    ) -> Result<BufferRecord, ChatkeepError> {
        self.receive_at(key, text, chrono::Utc::now().timestamp())
            .await
    }

    /// Buffer `text` as of `now` (epoch seconds) and (re)start the execution.
    ///
    /// Returns the buffer as left by this call. `execution_handle` is `None`
    /// when a newer message overtook this one before its handle was recorded.
    pub async fn receive_at(
        &self,
        key: &ConversationKey,
        text: &str,
        now: i64,
    ) -> Result<BufferRecord, ChatkeepError> {
        if let Some(existing) = self.buffer.get_buffer(key).await?
            && let Some(handle) = &existing.execution_handle
        {
            self.cancel_best_effort(key, handle).await;
        }

        let record = self.buffer.append_message(key, text, now).await?;
        debug!(
            conversation = %key,
            last_update = record.last_update,
            len = record.text.len(),
            "message buffered"
        );

        let input = ExecutionInput {
            instance_name: key.instance_id.clone(),
            cellphone_number: key.conversant_id.clone(),
            message: record.text.clone(),
            last_update: record.last_update,
        };
        let handle = self.executions.start(&input).await?;

        if self
            .buffer
            .record_execution(key, record.last_update, &handle)
            .await?
        {
            info!(
                conversation = %key,
                handle = %handle,
                last_update = record.last_update,
                "debounce execution pending"
            );
            Ok(BufferRecord {
                execution_handle: Some(handle),
                ..record
            })
        } else {
            // A newer message already moved the buffer on and started its own execution.
            warn!(
                conversation = %key,
                handle = %handle,
                "buffer advanced before the execution was recorded, cancelling it"
            );
            self.cancel_best_effort(key, &handle).await;
            Ok(record)
        }
    }

    /// One cancellation attempt. Failures are logged and never propagate.
    async fn cancel_best_effort(&self, key: &ConversationKey, handle: &ExecutionHandle) {
        match self.executions.cancel(handle).await {
            Ok(CancelOutcome::Cancelled) => {
                debug!(conversation = %key, handle = %handle, "previous execution cancelled");
            }
            Ok(CancelOutcome::NotFound) => {
                warn!(conversation = %key, handle = %handle, "execution to cancel no longer exists");
            }
            Err(e) => {
                error!(conversation = %key, handle = %handle, error = %e, "failed to cancel execution");
            }
        }
    }
}
