// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the `CheckpointSaver` trait.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error, warn};

use chatkeep_config::model::StorageConfig;
use chatkeep_core::types::{
    ChannelVersions, Checkpoint, CheckpointMetadata, CheckpointTuple, ListOptions, PendingWrite,
    ThreadConfig, TypedBlob,
};
use chatkeep_core::{
    AdapterType, ChatkeepError, CheckpointSaver, CheckpointStream, HealthStatus, PluginAdapter,
    SerializerProtocol,
};

use crate::database::Database;
use crate::keys;
use crate::queries;
use crate::queries::checkpoints::{CheckpointRow, NewCheckpoint};
use crate::queries::writes::WriteRow;
use crate::schema::{self, CheckpointTables};
use crate::serializer::JsonSerializer;

/// Default number of records fetched per page by [`CheckpointSaver::list`].
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Checkpoint saver over two partition-key/sort-key tables.
///
/// Checkpoints live under `(thread_id, "{ns}#{millis:020}")`, pending writes
/// under `(thread_id, "{ns}#{checkpoint_id}#{task_id}#{idx:010}")`. Payloads
/// are opaque tagged blobs produced by the configured serializer.
#[derive(Clone)]
pub struct SqliteCheckpointSaver {
    db: Database,
    tables: CheckpointTables,
    serializer: Arc<dyn SerializerProtocol>,
    page_size: usize,
}

impl SqliteCheckpointSaver {
    /// Create a saver over existing tables, using JSON payloads.
    pub fn new(db: Database, tables: CheckpointTables) -> Self {
        Self {
            db,
            tables,
            serializer: Arc::new(JsonSerializer),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Build a saver from `[storage]`, creating both tables if missing.
    ///
    /// Fails with `ChatkeepError::Config` when a table name is not configured.
    pub async fn open(db: Database, config: &StorageConfig) -> Result<Self, ChatkeepError> {
        let tables = CheckpointTables::from_config(config)?;
        schema::ensure_checkpoint_tables(&db, &tables).await?;
        debug!(
            checkpoints = %tables.checkpoints,
            writes = %tables.writes,
            "checkpoint saver ready"
        );
        Ok(Self::new(db, tables).with_page_size(config.list_page_size))
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn SerializerProtocol>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn tables(&self) -> &CheckpointTables {
        &self.tables
    }

    async fn load_pending_writes(
        &self,
        thread_id: &str,
        ns: &str,
        checkpoint_id: &str,
    ) -> Result<Vec<PendingWrite>, ChatkeepError> {
        let mut rows =
            queries::writes::for_checkpoint(&self.db, &self.tables.writes, thread_id, ns, checkpoint_id)
                .await?;
        // Key order interleaves tasks by id prefix; normalize explicitly.
        rows.sort_by(|a, b| (&a.task_id, a.idx).cmp(&(&b.task_id, b.idx)));
        rows.into_iter()
            .map(|row| {
                let WriteRow {
                    task_id,
                    channel,
                    type_tag,
                    value,
                    ..
                } = row;
                let value = self.serializer.loads_typed(&TypedBlob {
                    type_tag,
                    bytes: value,
                })?;
                Ok(PendingWrite {
                    task_id,
                    channel,
                    value,
                })
            })
            .collect()
    }
}

/// Decode one checkpoint record into a tuple without pending writes.
///
/// An undecodable checkpoint is an error; undecodable metadata is logged and
/// replaced with empty metadata.
fn decode_row(
    serializer: &dyn SerializerProtocol,
    thread_id: &str,
    ns: &str,
    row: CheckpointRow,
) -> Result<CheckpointTuple, ChatkeepError> {
    let checkpoint_value = serializer.loads_typed(&TypedBlob {
        type_tag: row.type_tag.clone(),
        bytes: row.checkpoint,
    })?;
    let checkpoint: Checkpoint = serde_json::from_value(checkpoint_value).map_err(|e| {
        ChatkeepError::deserialization(format!(
            "checkpoint {} is not a valid checkpoint: {e}",
            row.checkpoint_id
        ))
    })?;

    let metadata_blob = TypedBlob {
        type_tag: row.type_tag,
        bytes: row.metadata,
    };
    let metadata = match serializer.loads_typed(&metadata_blob).and_then(|v| {
        serde_json::from_value::<CheckpointMetadata>(v)
            .map_err(|e| ChatkeepError::deserialization(e.to_string()))
    }) {
        Ok(metadata) => metadata,
        Err(e) => {
            error!(
                thread_id,
                checkpoint_id = %row.checkpoint_id,
                error = %e,
                "failed to decode checkpoint metadata, using empty metadata"
            );
            CheckpointMetadata::default()
        }
    };

    let parent_config = row.parent_checkpoint_id.map(|parent| {
        ThreadConfig::new(thread_id)
            .with_namespace(ns)
            .with_checkpoint_id(parent)
    });

    Ok(CheckpointTuple {
        config: ThreadConfig::new(thread_id)
            .with_namespace(ns)
            .with_checkpoint_id(row.checkpoint_id),
        checkpoint,
        metadata,
        parent_config,
        pending_writes: Vec::new(),
    })
}

fn to_value<T: serde::Serialize>(what: &str, value: &T) -> Result<Value, ChatkeepError> {
    serde_json::to_value(value)
        .map_err(|e| ChatkeepError::Internal(format!("failed to encode {what}: {e}")))
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Cursor state for the paged list stream.
enum Cursor {
    Start,
    After(String),
    Done,
}

#[async_trait]
impl PluginAdapter for SqliteCheckpointSaver {
    fn name(&self) -> &str {
        "sqlite-checkpoint"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Checkpoint
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatkeepError> {
        match self.db.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), ChatkeepError> {
        self.db.checkpoint_wal().await
    }
}

#[async_trait]
impl CheckpointSaver for SqliteCheckpointSaver {
    async fn get_tuple(
        &self,
        config: &ThreadConfig,
    ) -> Result<Option<CheckpointTuple>, ChatkeepError> {
        let thread_id = config.thread_id.as_str();
        let ns = config.checkpoint_ns.as_str();
        let table = &self.tables.checkpoints;

        let row = match &config.checkpoint_id {
            Some(id) => queries::checkpoints::by_id(&self.db, table, thread_id, ns, id).await?,
            None => queries::checkpoints::latest(&self.db, table, thread_id, ns).await?,
        };
        let Some(row) = row else {
            return Ok(None);
        };

        let checkpoint_id = row.checkpoint_id.clone();
        let mut tuple = decode_row(self.serializer.as_ref(), thread_id, ns, row)?;
        tuple.pending_writes = self
            .load_pending_writes(thread_id, ns, &checkpoint_id)
            .await?;
        Ok(Some(tuple))
    }

    async fn list(
        &self,
        config: Option<&ThreadConfig>,
        options: ListOptions,
    ) -> Result<CheckpointStream, ChatkeepError> {
        let config = config
            .ok_or_else(|| ChatkeepError::Config("list requires a thread config".to_string()))?;
        let thread_id = config.thread_id.clone();
        let ns = config.checkpoint_ns.clone();

        let start = match options.before.as_ref().and_then(|b| b.checkpoint_id.as_deref()) {
            Some(before_id) => {
                match queries::checkpoints::by_id(
                    &self.db,
                    &self.tables.checkpoints,
                    &thread_id,
                    &ns,
                    before_id,
                )
                .await?
                {
                    Some(row) => Cursor::After(row.sort_key),
                    None => {
                        debug!(%thread_id, before_id, "list: unknown `before` checkpoint");
                        Cursor::Done
                    }
                }
            }
            None => Cursor::Start,
        };

        let db = self.db.clone();
        let table = self.tables.checkpoints.clone();
        let page_size = self.page_size;
        let page_thread = thread_id.clone();
        let page_ns = ns.clone();

        let pages = stream::unfold(start, move |cursor| {
            let db = db.clone();
            let table = table.clone();
            let thread_id = page_thread.clone();
            let ns = page_ns.clone();
            async move {
                let before = match cursor {
                    Cursor::Done => return None,
                    Cursor::Start => None,
                    Cursor::After(key) => Some(key),
                };
                match queries::checkpoints::page(
                    &db,
                    &table,
                    &thread_id,
                    &ns,
                    before.as_deref(),
                    page_size,
                )
                .await
                {
                    Ok(rows) => {
                        let next = match rows.last() {
                            Some(last) if rows.len() == page_size => {
                                Cursor::After(last.sort_key.clone())
                            }
                            _ => Cursor::Done,
                        };
                        Some((Ok(rows), next))
                    }
                    Err(e) => Some((Err(e), Cursor::Done)),
                }
            }
        });

        let serializer = Arc::clone(&self.serializer);
        let filter = options.filter;
        let tuples = pages
            .flat_map(|page| {
                let items: Vec<Result<CheckpointRow, ChatkeepError>> = match page {
                    Ok(rows) => rows.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            })
            .filter_map(move |item| {
                let out = match item {
                    Err(e) => Some(Err(e)),
                    Ok(row) => {
                        let sort_key = row.sort_key.clone();
                        match decode_row(serializer.as_ref(), &thread_id, &ns, row) {
                            Ok(tuple) => filter
                                .as_ref()
                                .is_none_or(|f| tuple.metadata.matches(f))
                                .then_some(Ok(tuple)),
                            Err(e) => {
                                error!(
                                    %thread_id,
                                    %sort_key,
                                    error = %e,
                                    "skipping undecodable checkpoint"
                                );
                                None
                            }
                        }
                    }
                };
                futures::future::ready(out)
            });

        Ok(match options.limit {
            Some(limit) => tuples.take(limit).boxed(),
            None => tuples.boxed(),
        })
    }

    async fn put(
        &self,
        config: &ThreadConfig,
        checkpoint: &Checkpoint,
        metadata: &CheckpointMetadata,
        _new_versions: &ChannelVersions,
    ) -> Result<ThreadConfig, ChatkeepError> {
        let checkpoint_blob = self.serializer.dumps_typed(&to_value("checkpoint", checkpoint)?)?;
        let metadata_blob = self.serializer.dumps_typed(&to_value("metadata", metadata)?)?;
        if metadata_blob.type_tag != checkpoint_blob.type_tag {
            // Metadata is read back with the checkpoint's tag.
            warn!(
                checkpoint_tag = %checkpoint_blob.type_tag,
                metadata_tag = %metadata_blob.type_tag,
                "metadata serialized with a different tag than its checkpoint"
            );
        }

        let record = NewCheckpoint {
            checkpoint_id: checkpoint.id.clone(),
            parent_checkpoint_id: config.checkpoint_id.clone(),
            type_tag: checkpoint_blob.type_tag,
            checkpoint: checkpoint_blob.bytes,
            metadata: metadata_blob.bytes,
        };
        let sort_key = queries::checkpoints::insert(
            &self.db,
            &self.tables.checkpoints,
            &config.thread_id,
            &config.checkpoint_ns,
            record,
            now_millis(),
        )
        .await?;
        debug!(
            thread_id = %config.thread_id,
            checkpoint_id = %checkpoint.id,
            %sort_key,
            "checkpoint stored"
        );

        Ok(ThreadConfig::new(config.thread_id.clone())
            .with_namespace(config.checkpoint_ns.clone())
            .with_checkpoint_id(checkpoint.id.clone()))
    }

    async fn put_writes(
        &self,
        config: &ThreadConfig,
        writes: &[(String, Value)],
        task_id: &str,
        task_path: &str,
    ) -> Result<(), ChatkeepError> {
        let checkpoint_id = config
            .checkpoint_id
            .as_deref()
            .ok_or(ChatkeepError::MissingCheckpoint)?;
        let ns = config.checkpoint_ns.as_str();

        let rows = writes
            .iter()
            .enumerate()
            .map(|(idx, (channel, value))| {
                let blob = self.serializer.dumps_typed(value)?;
                Ok(WriteRow {
                    sort_key: keys::write_sort_key(ns, checkpoint_id, task_id, idx),
                    task_id: task_id.to_string(),
                    idx: idx as i64,
                    channel: channel.clone(),
                    type_tag: blob.type_tag,
                    value: blob.bytes,
                })
            })
            .collect::<Result<Vec<_>, ChatkeepError>>()?;

        queries::writes::upsert_batch(
            &self.db,
            &self.tables.writes,
            &config.thread_id,
            task_path,
            rows,
        )
        .await
    }

    async fn has_checkpoint(&self, thread_id: &str) -> Result<bool, ChatkeepError> {
        queries::checkpoints::thread_exists(&self.db, &self.tables.checkpoints, thread_id).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<u64, ChatkeepError> {
        let removed = queries::checkpoints::delete_thread(&self.db, &self.tables, thread_id).await?;
        debug!(thread_id, removed, "thread checkpoints deleted");
        Ok(removed)
    }

    async fn clear(&self) -> Result<u64, ChatkeepError> {
        let removed = queries::checkpoints::clear(&self.db, &self.tables).await?;
        debug!(removed, "all checkpoints deleted");
        Ok(removed)
    }
}
