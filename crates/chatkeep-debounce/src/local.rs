// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process cancelable execution service.
//!
//! Each execution is a tokio task that waits out the settle window and then
//! runs the [`ExecutionTarget`]. Cancelling before the window elapses trips
//! the task's [`CancellationToken`]; once the target has started, the
//! execution is gone and cancellation reports `NotFound`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use chatkeep_core::types::{CancelOutcome, ExecutionHandle, ExecutionInput};
use chatkeep_core::{
    AdapterType, ChatkeepError, ExecutionService, ExecutionTarget, HealthStatus, PluginAdapter,
};

/// Prefix of every handle issued by [`LocalExecutionService`].
pub const HANDLE_PREFIX: &str = "local:";

pub struct LocalExecutionService {
    resource_id: String,
    settle: Duration,
    target: Arc<dyn ExecutionTarget>,
    waiting: Arc<DashMap<String, CancellationToken>>,
    tasks: TaskTracker,
}

impl LocalExecutionService {
    /// `resource_id` names the workflow in logs; `settle` is the quiet period.
    pub fn new(
        resource_id: impl Into<String>,
        settle: Duration,
        target: Arc<dyn ExecutionTarget>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            settle,
            target,
            waiting: Arc::new(DashMap::new()),
            tasks: TaskTracker::new(),
        }
    }

    /// Executions still inside their settle window.
    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    /// Wait until every spawned execution, including running targets, has finished.
    ///
    /// The tracker is closed while waiting, so a concurrent `start` fails as
    /// if the service were shut down. Only call this once no more messages
    /// are arriving.
    #[doc(hidden)]
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

#[async_trait]
impl PluginAdapter for LocalExecutionService {
    fn name(&self) -> &str {
        "local-execution"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Execution
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatkeepError> {
        Ok(HealthStatus::Healthy)
    }

    /// Cancel everything still waiting and let running targets finish.
    async fn shutdown(&self) -> Result<(), ChatkeepError> {
        let pending: Vec<String> = self.waiting.iter().map(|e| e.key().clone()).collect();
        for id in &pending {
            if let Some((_, token)) = self.waiting.remove(id) {
                token.cancel();
            }
        }
        self.tasks.close();
        self.tasks.wait().await;
        info!(
            resource = %self.resource_id,
            cancelled = pending.len(),
            "execution service stopped"
        );
        Ok(())
    }
}

#[async_trait]
impl ExecutionService for LocalExecutionService {
    async fn start(&self, input: &ExecutionInput) -> Result<ExecutionHandle, ChatkeepError> {
        if self.tasks.is_closed() {
            return Err(ChatkeepError::ExecutionService {
                message: format!("execution service `{}` is shut down", self.resource_id),
                source: None,
            });
        }

        let id = format!("{HANDLE_PREFIX}{}", uuid::Uuid::new_v4());
        let token = CancellationToken::new();
        self.waiting.insert(id.clone(), token.clone());

        let waiting = Arc::clone(&self.waiting);
        let target = Arc::clone(&self.target);
        let settle = self.settle;
        let input = input.clone();
        let task_id = id.clone();

        self.tasks.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(handle = %task_id, "execution cancelled during settle window");
                }
                _ = tokio::time::sleep(settle) => {
                    // Past this point the execution can no longer be cancelled.
                    if waiting.remove(&task_id).is_none() {
                        return;
                    }
                    let key = input.key();
                    if let Err(e) = target.run(input).await {
                        error!(handle = %task_id, conversation = %key, error = %e, "execution failed");
                    }
                }
            }
        });

        debug!(handle = %id, settle_ms = self.settle.as_millis() as u64, "execution started");
        Ok(ExecutionHandle(id))
    }

    async fn cancel(&self, handle: &ExecutionHandle) -> Result<CancelOutcome, ChatkeepError> {
        match self.waiting.remove(&handle.0) {
            Some((_, token)) => {
                token.cancel();
                Ok(CancelOutcome::Cancelled)
            }
            None => Ok(CancelOutcome::NotFound),
        }
    }
}
