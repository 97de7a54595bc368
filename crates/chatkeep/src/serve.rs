// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatkeep serve` command implementation.
//!
//! Wires storage, the debounce pipeline and the webhook server together,
//! then serves until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use chatkeep_config::ChatkeepConfig;
use chatkeep_core::{ChatkeepError, HealthStatus, PluginAdapter};
use chatkeep_debounce::{
    CommandDispatcher, DebounceConsumer, DebounceCoordinator, HttpDispatcher,
    LocalExecutionService,
};
use chatkeep_storage::{Database, SqliteBufferStore, SqliteCheckpointSaver};
use chatkeep_whatsapp::{ServerConfig, WebhookState, start_server};

use crate::shutdown;

pub async fn run_serve(config: ChatkeepConfig) -> Result<(), ChatkeepError> {
    info!("starting chatkeep serve");

    // Fail fast on anything the pipeline cannot run without.
    let processor_url = config.debounce.require_processor_url()?.to_string();
    let resource_id = config.execution.require_resource_id()?.to_string();

    let db = Database::open(&config.storage.database_path).await?;
    let saver = Arc::new(SqliteCheckpointSaver::open(db.clone(), &config.storage).await?);
    let buffer = Arc::new(SqliteBufferStore::open(db.clone(), &config.storage).await?);
    log_health(&*saver).await;
    log_health(&*buffer).await;

    let processor = Arc::new(HttpDispatcher::new(processor_url)?);
    let dispatcher = Arc::new(CommandDispatcher::new(saver.clone(), processor));
    let consumer = DebounceConsumer::new(buffer.clone(), dispatcher);

    let settle = Duration::from_secs(config.debounce.settle_secs);
    let executions = Arc::new(LocalExecutionService::new(
        resource_id,
        settle,
        Arc::new(consumer),
    ));
    let coordinator = DebounceCoordinator::new(buffer.clone(), executions.clone());
    info!(settle_secs = config.debounce.settle_secs, "debounce pipeline ready");

    let cancel = shutdown::install_signal_handler();
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    start_server(&server_config, WebhookState::new(coordinator), cancel).await?;

    // Unsettled buffers stay in the store; the next message restarts them.
    executions.shutdown().await?;
    db.checkpoint_wal().await?;

    info!("chatkeep serve shutdown complete");
    Ok(())
}

async fn log_health(adapter: &dyn PluginAdapter) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => {
            info!(adapter = adapter.name(), version = %adapter.version(), "adapter healthy");
        }
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(adapter = adapter.name(), %reason, "adapter not healthy");
        }
        Err(e) => {
            warn!(adapter = adapter.name(), error = %e, "adapter health check failed");
        }
    }
}
