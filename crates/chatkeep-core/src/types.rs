// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Checkpoint,
    Buffer,
    Execution,
}

// --- Checkpoint types ---

/// Per-channel version markers supplied by the execution engine.
pub type ChannelVersions = BTreeMap<String, Value>;

/// Addresses one conversation thread, and optionally one checkpoint in it.
///
/// This is the `configurable` section the engine passes to every saver call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadConfig {
    pub thread_id: String,
    #[serde(default)]
    pub checkpoint_ns: String,
    #[serde(default)]
    pub checkpoint_id: Option<String>,
}

impl ThreadConfig {
    /// Config for the root namespace of a thread, pointing at its latest checkpoint.
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            checkpoint_ns: String::new(),
            checkpoint_id: None,
        }
    }

    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.checkpoint_ns = ns.into();
        self
    }

    pub fn with_checkpoint_id(mut self, id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(id.into());
        self
    }
}

/// A snapshot of graph state produced by the execution engine.
///
/// The saver never interprets these fields beyond `id`; everything is
/// serialized as an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub v: u32,
    pub id: String,
    pub ts: String,
    #[serde(default)]
    pub channel_values: Map<String, Value>,
    #[serde(default)]
    pub channel_versions: ChannelVersions,
    #[serde(default)]
    pub versions_seen: BTreeMap<String, ChannelVersions>,
    #[serde(default)]
    pub pending_sends: Vec<Value>,
}

impl Checkpoint {
    /// An empty checkpoint with the given id, timestamped now.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            v: 1,
            id: id.into(),
            ts: chrono::Utc::now().to_rfc3339(),
            channel_values: Map::new(),
            channel_versions: ChannelVersions::new(),
            versions_seen: BTreeMap::new(),
            pending_sends: Vec::new(),
        }
    }
}

/// Metadata recorded next to each checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// What produced the checkpoint ("input", "loop", "update").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writes: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parents: BTreeMap<String, String>,
    /// Engine-specific keys that have no dedicated field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckpointMetadata {
    /// True when every `(key, value)` in `filter` is present in this metadata.
    pub fn matches(&self, filter: &Map<String, Value>) -> bool {
        let Ok(Value::Object(own)) = serde_json::to_value(self) else {
            return filter.is_empty();
        };
        filter.iter().all(|(k, v)| own.get(k) == Some(v))
    }
}

/// One channel value written by a task before its checkpoint was committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub task_id: String,
    pub channel: String,
    pub value: Value,
}

/// Everything the engine needs to resume from one checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointTuple {
    pub config: ThreadConfig,
    pub checkpoint: Checkpoint,
    pub metadata: CheckpointMetadata,
    pub parent_config: Option<ThreadConfig>,
    pub pending_writes: Vec<PendingWrite>,
}

/// A serialized payload and the tag that selects its decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedBlob {
    pub type_tag: String,
    pub bytes: Vec<u8>,
}

/// Options for [`CheckpointSaver::list`](crate::CheckpointSaver::list).
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Keep only checkpoints whose metadata contains all of these pairs.
    pub filter: Option<Map<String, Value>>,
    /// Keep only checkpoints strictly older than this one.
    pub before: Option<ThreadConfig>,
    /// Maximum number of tuples to yield.
    pub limit: Option<usize>,
}

// --- Debounce types ---

/// Identity of one conversation: a messaging instance and the person on the other end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub instance_id: String,
    pub conversant_id: String,
}

impl ConversationKey {
    pub fn new(instance_id: impl Into<String>, conversant_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            conversant_id: conversant_id.into(),
        }
    }

    /// The checkpoint thread that holds this conversation's graph state.
    pub fn thread_id(&self) -> String {
        format!("{}#{}", self.instance_id, self.conversant_id)
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.instance_id, self.conversant_id)
    }
}

/// Opaque reference to one in-flight cancelable execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionHandle(pub String);

impl std::fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Messages buffered for one conversation while the sender is still typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferRecord {
    pub key: ConversationKey,
    pub text: String,
    /// Epoch seconds of the last append; doubles as the staleness token.
    pub last_update: i64,
    pub execution_handle: Option<ExecutionHandle>,
}

/// Input handed to a started execution. Field names are the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionInput {
    pub instance_name: String,
    pub cellphone_number: String,
    pub message: String,
    pub last_update: i64,
}

impl ExecutionInput {
    pub fn key(&self) -> ConversationKey {
        ConversationKey::new(&self.instance_name, &self.cellphone_number)
    }
}

/// Result of a cancellation request that reached the execution service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CancelOutcome {
    #[strum(serialize = "cancelled")]
    Cancelled,
    /// The execution already finished or never existed.
    #[strum(serialize = "not_found")]
    NotFound,
}

/// Coalesced user text claimed by a consumer, ready for the conversation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub key: ConversationKey,
    pub text: String,
    pub last_update: i64,
}
