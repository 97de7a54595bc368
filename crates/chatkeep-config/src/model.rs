// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the chatkeep backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use chatkeep_core::ChatkeepError;
use serde::{Deserialize, Serialize};

/// Top-level chatkeep configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// Table names and the execution resource have no defaults: the components that
/// need them call the `require_*` accessors and fail fast when they are absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatkeepConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Store location and table names.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Debounce window and downstream processor.
    #[serde(default)]
    pub debounce: DebounceConfig,

    /// Cancelable execution service settings.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Inbound webhook listener.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Table holding checkpoint records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_table: Option<String>,

    /// Table holding pending-write records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writes_table: Option<String>,

    /// Table holding debounce buffer records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_table: Option<String>,

    /// Number of checkpoint records fetched per page when listing.
    #[serde(default = "default_list_page_size")]
    pub list_page_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            checkpoint_table: None,
            writes_table: None,
            buffer_table: None,
            list_page_size: default_list_page_size(),
        }
    }
}

impl StorageConfig {
    pub fn require_checkpoint_table(&self) -> Result<&str, ChatkeepError> {
        require("storage.checkpoint_table", self.checkpoint_table.as_deref())
    }

    pub fn require_writes_table(&self) -> Result<&str, ChatkeepError> {
        require("storage.writes_table", self.writes_table.as_deref())
    }

    pub fn require_buffer_table(&self) -> Result<&str, ChatkeepError> {
        require("storage.buffer_table", self.buffer_table.as_deref())
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("chatkeep").join("chatkeep.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("chatkeep.db"))
        .display()
        .to_string()
}

fn default_list_page_size() -> usize {
    50
}

/// Message debouncing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebounceConfig {
    /// Seconds a conversation must stay quiet before its buffer is processed.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,

    /// URL the coalesced conversation turn is POSTed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor_url: Option<String>,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            settle_secs: default_settle_secs(),
            processor_url: None,
        }
    }
}

impl DebounceConfig {
    pub fn require_processor_url(&self) -> Result<&str, ChatkeepError> {
        require("debounce.processor_url", self.processor_url.as_deref())
    }
}

fn default_settle_secs() -> u64 {
    10
}

/// Cancelable execution service configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Identifier of the workflow every execution is started against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ExecutionConfig {
    pub fn require_resource_id(&self) -> Result<&str, ChatkeepError> {
        require("execution.resource_id", self.resource_id.as_deref())
    }
}

/// Webhook listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn require<'a>(key: &str, value: Option<&'a str>) -> Result<&'a str, ChatkeepError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ChatkeepError::Config(format!("`{key}` is not configured"))),
    }
}
