// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait shared by every storage and execution backend.

use async_trait::async_trait;

use crate::error::ChatkeepError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for all chatkeep adapters.
///
/// Provides identity, lifecycle, and health check capabilities. Adapters are
/// constructed once per process and shared behind `Arc`.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the role this adapter plays.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, ChatkeepError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), ChatkeepError>;
}
