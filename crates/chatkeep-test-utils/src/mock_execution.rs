// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock execution service with scripted cancellation results.
//!
//! Handles are issued in order as `E1`, `E2`, ... Nothing ever runs; tests
//! drive completions by calling the consumer with the captured inputs.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chatkeep_core::types::{CancelOutcome, ExecutionHandle, ExecutionInput};
use chatkeep_core::{AdapterType, ChatkeepError, ExecutionService, HealthStatus, PluginAdapter};

#[derive(Default)]
struct State {
    started: Vec<(ExecutionHandle, ExecutionInput)>,
    cancelled: Vec<ExecutionHandle>,
    cancel_script: VecDeque<Result<CancelOutcome, String>>,
    failing_starts: usize,
}

#[derive(Clone, Default)]
pub struct MockExecutionService {
    state: Arc<Mutex<State>>,
}

impl MockExecutionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every successful `start`, in call order.
    pub async fn started(&self) -> Vec<(ExecutionHandle, ExecutionInput)> {
        self.state.lock().await.started.clone()
    }

    /// Input of the most recent successful `start`.
    pub async fn last_input(&self) -> Option<ExecutionInput> {
        self.state.lock().await.started.last().map(|(_, i)| i.clone())
    }

    /// Every handle passed to `cancel`, in call order.
    pub async fn cancelled(&self) -> Vec<ExecutionHandle> {
        self.state.lock().await.cancelled.clone()
    }

    /// Result of the next `cancel` call. Unscripted calls report `Cancelled`.
    pub async fn script_cancel(&self, outcome: CancelOutcome) {
        self.state.lock().await.cancel_script.push_back(Ok(outcome));
    }

    /// Make the next `cancel` call fail with `message`.
    pub async fn script_cancel_error(&self, message: &str) {
        self.state
            .lock()
            .await
            .cancel_script
            .push_back(Err(message.to_string()));
    }

    /// Make the next `count` `start` calls fail.
    pub async fn fail_starts(&self, count: usize) {
        self.state.lock().await.failing_starts += count;
    }
}

#[async_trait]
impl PluginAdapter for MockExecutionService {
    fn name(&self) -> &str {
        "mock-execution"
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

    async fn shutdown(&self) -> Result<(), ChatkeepError> {
        Ok(())
    }
}

#[async_trait]
impl ExecutionService for MockExecutionService {
    async fn start(&self, input: &ExecutionInput) -> Result<ExecutionHandle, ChatkeepError> {
        let mut state = self.state.lock().await;
        if state.failing_starts > 0 {
            state.failing_starts -= 1;
            return Err(ChatkeepError::ExecutionService {
                message: "mock start failure".to_string(),
                source: None,
            });
        }
        let handle = ExecutionHandle(format!("E{}", state.started.len() + 1));
        state.started.push((handle.clone(), input.clone()));
        Ok(handle)
    }

    async fn cancel(&self, handle: &ExecutionHandle) -> Result<CancelOutcome, ChatkeepError> {
        let mut state = self.state.lock().await;
        state.cancelled.push(handle.clone());
        match state.cancel_script.pop_front() {
            None => Ok(CancelOutcome::Cancelled),
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(ChatkeepError::ExecutionService {
                message,
                source: None,
            }),
        }
    }
}
