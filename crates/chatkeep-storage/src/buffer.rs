// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the `BufferStore` trait.

use async_trait::async_trait;
use tracing::debug;

use chatkeep_config::model::StorageConfig;
use chatkeep_core::types::{BufferRecord, ConversationKey, ExecutionHandle};
use chatkeep_core::{AdapterType, BufferStore, ChatkeepError, HealthStatus, PluginAdapter};

use crate::database::Database;
use crate::queries;
use crate::schema;

/// Debounce buffer keyed by `(instance_name, cellphone_number)`.
#[derive(Clone)]
pub struct SqliteBufferStore {
    db: Database,
    table: String,
}

impl SqliteBufferStore {
    /// Wrap an existing buffer table.
    pub fn new(db: Database, table: impl Into<String>) -> Result<Self, ChatkeepError> {
        let table = table.into();
        schema::validated_table_name(&table)?;
        Ok(Self { db, table })
    }

    /// Build the store from `[storage]`, creating the table if missing.
    pub async fn open(db: Database, config: &StorageConfig) -> Result<Self, ChatkeepError> {
        let store = Self::new(db, config.require_buffer_table()?)?;
        schema::ensure_buffer_table(&store.db, &store.table).await?;
        debug!(table = %store.table, "buffer store ready");
        Ok(store)
    }
}

#[async_trait]
impl PluginAdapter for SqliteBufferStore {
    fn name(&self) -> &str {
        "sqlite-buffer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Buffer
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatkeepError> {
        match self.db.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), ChatkeepError> {
        Ok(())
    }
}

#[async_trait]
impl BufferStore for SqliteBufferStore {
    async fn get_buffer(
        &self,
        key: &ConversationKey,
    ) -> Result<Option<BufferRecord>, ChatkeepError> {
        queries::buffer::get(&self.db, &self.table, key).await
    }

    async fn append_message(
        &self,
        key: &ConversationKey,
        text: &str,
        now: i64,
    ) -> Result<BufferRecord, ChatkeepError> {
        queries::buffer::append(&self.db, &self.table, key, text, now).await
    }

    async fn record_execution(
        &self,
        key: &ConversationKey,
        expected_last_update: i64,
        handle: &ExecutionHandle,
    ) -> Result<bool, ChatkeepError> {
        queries::buffer::record_execution(&self.db, &self.table, key, expected_last_update, handle)
            .await
    }

    async fn take_if_current(
        &self,
        key: &ConversationKey,
        expected_last_update: i64,
    ) -> Result<Option<BufferRecord>, ChatkeepError> {
        queries::buffer::take_if_current(&self.db, &self.table, key, expected_last_update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_requires_buffer_table() {
        let db = Database::open_in_memory().await.unwrap();
        let result = SqliteBufferStore::open(db, &StorageConfig::default()).await;
        assert!(matches!(result, Err(ChatkeepError::Config(_))));
    }

    #[tokio::test]
    async fn implements_plugin_adapter() {
        let db = Database::open_in_memory().await.unwrap();
        let config = StorageConfig {
            buffer_table: Some("debounce_buffer".into()),
            ..Default::default()
        };
        let store = SqliteBufferStore::open(db, &config).await.unwrap();
        assert_eq!(store.name(), "sqlite-buffer");
        assert_eq!(store.adapter_type(), AdapterType::Buffer);
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn rejects_invalid_table_name() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(SqliteBufferStore::new(db, "buffer; --").is_err());
    }
}
