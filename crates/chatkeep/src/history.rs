// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatkeep history` command implementation.

use std::io::Write;

use futures::StreamExt;
use serde::Serialize;

use chatkeep_config::ChatkeepConfig;
use chatkeep_core::types::{CheckpointTuple, ListOptions, ThreadConfig};
use chatkeep_core::{ChatkeepError, CheckpointSaver};
use chatkeep_storage::{Database, SqliteCheckpointSaver};

/// One line of `--json` output.
#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    checkpoint_id: &'a str,
    parent_checkpoint_id: Option<&'a str>,
    ts: &'a str,
    source: Option<&'a str>,
    step: Option<i64>,
}

impl<'a> From<&'a CheckpointTuple> for HistoryEntry<'a> {
    fn from(tuple: &'a CheckpointTuple) -> Self {
        Self {
            checkpoint_id: &tuple.checkpoint.id,
            parent_checkpoint_id: tuple
                .parent_config
                .as_ref()
                .and_then(|p| p.checkpoint_id.as_deref()),
            ts: &tuple.checkpoint.ts,
            source: tuple.metadata.source.as_deref(),
            step: tuple.metadata.step,
        }
    }
}

pub async fn run_history(
    config: &ChatkeepConfig,
    thread: &str,
    ns: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<(), ChatkeepError> {
    let db = Database::open(&config.storage.database_path).await?;
    let saver = SqliteCheckpointSaver::open(db, &config.storage).await?;
    let thread_config = ThreadConfig::new(thread).with_namespace(ns);

    let mut stdout = std::io::stdout().lock();
    let shown = write_history(&saver, &thread_config, limit, json, &mut stdout).await?;
    if shown == 0 && !json {
        eprintln!("no checkpoints for thread `{thread}`");
    }
    Ok(())
}

/// Stream the thread's checkpoints into `out`, newest first. Returns how many were written.
pub(crate) async fn write_history(
    saver: &dyn CheckpointSaver,
    config: &ThreadConfig,
    limit: Option<usize>,
    json: bool,
    out: &mut impl Write,
) -> Result<usize, ChatkeepError> {
    let options = ListOptions {
        limit,
        ..Default::default()
    };
    let mut stream = saver.list(Some(config), options).await?;
    let mut shown = 0;

    while let Some(item) = stream.next().await {
        let tuple = item?;
        let entry = HistoryEntry::from(&tuple);
        let written = if json {
            serde_json::to_string(&entry)
                .map_err(|e| ChatkeepError::Internal(format!("failed to encode entry: {e}")))
                .and_then(|line| writeln!(out, "{line}").map_err(io_error))
        } else {
            writeln!(
                out,
                "{}\t{}\t{}\t{}",
                entry.checkpoint_id,
                entry.ts,
                entry.source.unwrap_or("-"),
                entry.step.map_or_else(|| "-".to_string(), |s| s.to_string()),
            )
            .map_err(io_error)
        };
        written?;
        shown += 1;
    }
    Ok(shown)
}

fn io_error(e: std::io::Error) -> ChatkeepError {
    ChatkeepError::Internal(format!("failed to write output: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatkeep_config::model::StorageConfig;
    use chatkeep_core::types::{ChannelVersions, Checkpoint, CheckpointMetadata};

    async fn saver_with(ids: &[&str]) -> SqliteCheckpointSaver {
        let db = Database::open_in_memory().await.unwrap();
        let storage = StorageConfig {
            checkpoint_table: Some("checkpoints".into()),
            writes_table: Some("checkpoint_writes".into()),
            ..Default::default()
        };
        let saver = SqliteCheckpointSaver::open(db, &storage).await.unwrap();
        let mut config = ThreadConfig::new("shop#55");
        for (step, id) in ids.iter().enumerate() {
            let metadata = CheckpointMetadata {
                source: Some("loop".into()),
                step: Some(step as i64),
                ..Default::default()
            };
            config = saver
                .put(&config, &Checkpoint::new(*id), &metadata, &ChannelVersions::new())
                .await
                .unwrap();
        }
        saver
    }

    #[tokio::test]
    async fn plain_output_lists_newest_first() {
        let saver = saver_with(&["c1", "c2", "c3"]).await;
        let mut out = Vec::new();
        let shown = write_history(&saver, &ThreadConfig::new("shop#55"), None, false, &mut out)
            .await
            .unwrap();

        assert_eq!(shown, 3);
        let text = String::from_utf8(out).unwrap();
        let ids: Vec<&str> = text
            .lines()
            .map(|l| l.split('\t').next().unwrap())
            .collect();
        assert_eq!(ids, vec!["c3", "c2", "c1"]);
        assert!(text.lines().next().unwrap().ends_with("\tloop\t2"));
    }

    #[tokio::test]
    async fn json_output_respects_limit() {
        let saver = saver_with(&["c1", "c2", "c3"]).await;
        let mut out = Vec::new();
        let shown = write_history(&saver, &ThreadConfig::new("shop#55"), Some(2), true, &mut out)
            .await
            .unwrap();

        assert_eq!(shown, 2);
        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["checkpoint_id"], "c3");
        assert_eq!(lines[0]["parent_checkpoint_id"], "c2");
        assert_eq!(lines[1]["checkpoint_id"], "c2");
        assert_eq!(lines[1]["step"], 1);
        assert!(lines[0].get("pending_writes").is_none());
    }

    #[tokio::test]
    async fn unknown_thread_shows_nothing() {
        let saver = saver_with(&[]).await;
        let mut out = Vec::new();
        let shown = write_history(&saver, &ThreadConfig::new("nobody"), None, false, &mut out)
            .await
            .unwrap();
        assert_eq!(shown, 0);
        assert!(out.is_empty());
    }
}
