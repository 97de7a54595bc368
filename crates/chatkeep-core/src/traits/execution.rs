// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancelable execution service and the work it eventually runs.

use async_trait::async_trait;

use crate::error::ChatkeepError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CancelOutcome, ExecutionHandle, ExecutionInput};

/// A service that starts delayed, cancelable executions.
#[async_trait]
pub trait ExecutionService: PluginAdapter {
    /// Starts an execution and returns its handle.
    async fn start(&self, input: &ExecutionInput) -> Result<ExecutionHandle, ChatkeepError>;

    /// Requests cancellation. Gone executions report [`CancelOutcome::NotFound`].
    async fn cancel(&self, handle: &ExecutionHandle) -> Result<CancelOutcome, ChatkeepError>;
}

/// The work an execution performs once its settle period elapses.
#[async_trait]
pub trait ExecutionTarget: Send + Sync + 'static {
    async fn run(&self, input: ExecutionInput) -> Result<(), ChatkeepError>;
}
