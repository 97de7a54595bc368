// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the whole debounce pipeline over a temp SQLite
//! database: buffer store, checkpoint saver, coordinator, consumer, a
//! maintenance-command dispatcher and a recording dispatcher behind it.

use std::sync::Arc;
use std::time::Duration;

use chatkeep_config::model::{ChatkeepConfig, StorageConfig};
use chatkeep_core::types::ConversationKey;
use chatkeep_core::{ChatkeepError, ConversationDispatcher, ExecutionService};
use chatkeep_debounce::{
    CommandDispatcher, DebounceConsumer, DebounceCoordinator, LocalExecutionService,
};
use chatkeep_storage::{Database, SqliteBufferStore, SqliteCheckpointSaver};

use crate::mock_execution::MockExecutionService;
use crate::recording_dispatcher::RecordingDispatcher;

/// Which execution service drives the consumer.
enum ExecutionMode {
    Mock,
    Local { settle: Duration },
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    mode: ExecutionMode,
    page_size: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            mode: ExecutionMode::Mock,
            page_size: 50,
        }
    }

    /// Run executions in-process with the given settle window instead of the mock.
    pub fn with_local_execution(mut self, settle: Duration) -> Self {
        self.mode = ExecutionMode::Local { settle };
        self
    }

    /// Page size used by the checkpoint saver's `list`.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub async fn build(self) -> Result<TestHarness, ChatkeepError> {
        let temp_dir = tempfile::TempDir::new().map_err(ChatkeepError::storage)?;
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();

        let config = ChatkeepConfig {
            storage: StorageConfig {
                database_path: db_path.clone(),
                checkpoint_table: Some("checkpoints".to_string()),
                writes_table: Some("checkpoint_writes".to_string()),
                buffer_table: Some("debounce_buffer".to_string()),
                list_page_size: self.page_size,
            },
            ..ChatkeepConfig::default()
        };

        let db = Database::open(&db_path).await?;
        let saver = Arc::new(SqliteCheckpointSaver::open(db.clone(), &config.storage).await?);
        let buffer = Arc::new(SqliteBufferStore::open(db.clone(), &config.storage).await?);

        let dispatcher = Arc::new(RecordingDispatcher::new());
        let commands: Arc<dyn ConversationDispatcher> = Arc::new(CommandDispatcher::new(
            saver.clone(),
            dispatcher.clone(),
        ));
        let consumer = DebounceConsumer::new(buffer.clone(), commands);

        let mut mock_execution = None;
        let mut local_execution = None;
        let executions: Arc<dyn ExecutionService> = match self.mode {
            ExecutionMode::Mock => {
                let mock = Arc::new(MockExecutionService::new());
                mock_execution = Some(mock.clone());
                mock
            }
            ExecutionMode::Local { settle } => {
                let local = Arc::new(LocalExecutionService::new(
                    "test-debounce",
                    settle,
                    Arc::new(consumer.clone()),
                ));
                local_execution = Some(local.clone());
                local
            }
        };

        let coordinator = DebounceCoordinator::new(buffer.clone(), executions);

        Ok(TestHarness {
            db,
            saver,
            buffer,
            dispatcher,
            consumer,
            coordinator,
            mock_execution,
            local_execution,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete debounce pipeline over temp storage.
pub struct TestHarness {
    /// Shared database handle (temp file, removed on drop).
    pub db: Database,
    pub saver: Arc<SqliteCheckpointSaver>,
    pub buffer: Arc<SqliteBufferStore>,
    /// Receives every non-command turn the consumer claims.
    pub dispatcher: Arc<RecordingDispatcher>,
    pub consumer: DebounceConsumer,
    pub coordinator: DebounceCoordinator,
    /// Set unless built with [`TestHarnessBuilder::with_local_execution`].
    pub mock_execution: Option<Arc<MockExecutionService>>,
    /// Set when built with [`TestHarnessBuilder::with_local_execution`].
    pub local_execution: Option<Arc<LocalExecutionService>>,
    pub config: ChatkeepConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Conversation key for `instance`/`phone`.
    pub fn key(instance: &str, phone: &str) -> ConversationKey {
        ConversationKey::new(instance, phone)
    }
}
