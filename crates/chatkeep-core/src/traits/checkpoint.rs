// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checkpoint saver trait used by the graph execution engine.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use serde_json::Value;

use crate::error::ChatkeepError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ChannelVersions, Checkpoint, CheckpointMetadata, CheckpointTuple, ListOptions, ThreadConfig,
};

/// Lazily produced checkpoint history, most recent first.
///
/// A storage failure ends the stream with one `Err` item.
pub type CheckpointStream =
    Pin<Box<dyn Stream<Item = Result<CheckpointTuple, ChatkeepError>> + Send>>;

/// Durable, queryable persistence for conversation checkpoints.
///
/// History is append-only: `put` adds a record with a later sort key and
/// never rewrites an existing one.
#[async_trait]
pub trait CheckpointSaver: PluginAdapter {
    /// Fetches one checkpoint tuple: the checkpoint named by `config.checkpoint_id`,
    /// or the latest one in the namespace when no id is given.
    async fn get_tuple(
        &self,
        config: &ThreadConfig,
    ) -> Result<Option<CheckpointTuple>, ChatkeepError>;

    /// Streams checkpoints for `config`'s thread and namespace, newest first.
    ///
    /// Fails with [`ChatkeepError::Config`] when `config` is `None`. Records
    /// that cannot be decoded are logged and skipped.
    async fn list(
        &self,
        config: Option<&ThreadConfig>,
        options: ListOptions,
    ) -> Result<CheckpointStream, ChatkeepError>;

    /// Appends a checkpoint and returns a config pointing at it.
    async fn put(
        &self,
        config: &ThreadConfig,
        checkpoint: &Checkpoint,
        metadata: &CheckpointMetadata,
        new_versions: &ChannelVersions,
    ) -> Result<ThreadConfig, ChatkeepError>;

    /// Records the channel writes produced by one task for `config.checkpoint_id`.
    async fn put_writes(
        &self,
        config: &ThreadConfig,
        writes: &[(String, Value)],
        task_id: &str,
        task_path: &str,
    ) -> Result<(), ChatkeepError>;

    /// Whether any checkpoint exists for the thread, in any namespace.
    async fn has_checkpoint(&self, thread_id: &str) -> Result<bool, ChatkeepError>;

    /// Removes all checkpoints and pending writes of one thread.
    async fn delete_thread(&self, thread_id: &str) -> Result<u64, ChatkeepError>;

    /// Removes all checkpoints and pending writes of every thread.
    async fn clear(&self) -> Result<u64, ChatkeepError>;

    /// Fetches only the checkpoint payload.
    async fn get(&self, config: &ThreadConfig) -> Result<Option<Checkpoint>, ChatkeepError> {
        Ok(self.get_tuple(config).await?.map(|t| t.checkpoint))
    }
}
