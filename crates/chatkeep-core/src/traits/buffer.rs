// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation buffer store used by the debouncer.

use async_trait::async_trait;

use crate::error::ChatkeepError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BufferRecord, ConversationKey, ExecutionHandle};

/// Persistence for per-conversation message buffers.
///
/// Concurrency control is optimistic: every mutation that races with a newer
/// message is conditioned on the `last_update` the caller last observed.
#[async_trait]
pub trait BufferStore: PluginAdapter {
    /// Reads the buffer for one conversation.
    async fn get_buffer(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<BufferRecord>, ChatkeepError>;

    /// Creates the buffer or appends `text` to it.
    ///
    /// Appending joins with a single space, moves `last_update` to
    /// `max(now, previous + 1)` and clears the execution handle.
    async fn append_message(
        &self,
        key: &ConversationKey,
        text: &str,
        now: i64,
    ) -> Result<BufferRecord, ChatkeepError>;

    /// Stores `handle` if the buffer's `last_update` still equals `expected_last_update`.
    ///
    /// Returns `false` when the buffer moved on or no longer exists.
    async fn record_execution(
        &self,
        key: &ConversationKey,
        expected_last_update: i64,
        handle: &ExecutionHandle,
    ) -> Result<bool, ChatkeepError>;

    /// Deletes and returns the buffer if its `last_update` equals `expected_last_update`.
    async fn take_if_current(
        &self,
        key: &ConversationKey,
        expected_last_update: i64,
    ) -> Result<Option<BufferRecord>, ChatkeepError>;
}
