// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatkeep amnesia` command implementation.

use tracing::info;

use chatkeep_config::ChatkeepConfig;
use chatkeep_core::{ChatkeepError, CheckpointSaver};
use chatkeep_storage::{Database, SqliteCheckpointSaver};

pub async fn run_amnesia(config: &ChatkeepConfig, thread: Option<&str>) -> Result<(), ChatkeepError> {
    let db = Database::open(&config.storage.database_path).await?;
    let saver = SqliteCheckpointSaver::open(db, &config.storage).await?;
    let removed = forget(&saver, thread).await?;
    match thread {
        Some(thread) => println!("removed {removed} records from thread `{thread}`"),
        None => println!("removed {removed} records from all threads"),
    }
    Ok(())
}

/// Delete one thread's checkpoints, or everything when `thread` is `None`.
pub(crate) async fn forget(
    saver: &dyn CheckpointSaver,
    thread: Option<&str>,
) -> Result<u64, ChatkeepError> {
    let removed = match thread {
        Some(thread_id) => saver.delete_thread(thread_id).await?,
        None => saver.clear().await?,
    };
    info!(thread = thread.unwrap_or("*"), removed, "checkpoints forgotten");
    Ok(removed)
}
