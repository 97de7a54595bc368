// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SQLite checkpoint saver.

use chatkeep_config::model::StorageConfig;
use chatkeep_core::types::{
    ChannelVersions, Checkpoint, CheckpointMetadata, ListOptions, ThreadConfig,
};
use chatkeep_core::{ChatkeepError, CheckpointSaver};
use chatkeep_storage::{Database, SqliteCheckpointSaver};
use futures::StreamExt;
use serde_json::{Value, json};
use tempfile::tempdir;

fn storage_config(page_size: usize) -> StorageConfig {
    StorageConfig {
        checkpoint_table: Some("checkpoints".into()),
        writes_table: Some("checkpoint_writes".into()),
        list_page_size: page_size,
        ..Default::default()
    }
}

async fn saver_with_page_size(page_size: usize) -> (SqliteCheckpointSaver, Database) {
    let db = Database::open_in_memory().await.unwrap();
    let saver = SqliteCheckpointSaver::open(db.clone(), &storage_config(page_size))
        .await
        .unwrap();
    (saver, db)
}

async fn saver() -> (SqliteCheckpointSaver, Database) {
    saver_with_page_size(50).await
}

fn checkpoint(id: &str, step: i64) -> (Checkpoint, CheckpointMetadata) {
    let mut cp = Checkpoint::new(id);
    cp.channel_values
        .insert("messages".into(), json!([format!("message {step}")]));
    let metadata = CheckpointMetadata {
        source: Some("loop".into()),
        step: Some(step),
        ..Default::default()
    };
    (cp, metadata)
}

/// Put a chain of checkpoints, each parented on the previous one.
async fn put_chain(saver: &SqliteCheckpointSaver, thread: &str, ids: &[&str]) -> ThreadConfig {
    let mut config = ThreadConfig::new(thread);
    for (step, id) in ids.iter().enumerate() {
        let (cp, md) = checkpoint(id, step as i64);
        config = saver
            .put(&config, &cp, &md, &ChannelVersions::new())
            .await
            .unwrap();
    }
    config
}

async fn collect_ids(saver: &SqliteCheckpointSaver, config: &ThreadConfig, options: ListOptions) -> Vec<String> {
    saver
        .list(Some(config), options)
        .await
        .unwrap()
        .map(|item| item.unwrap().checkpoint.id)
        .collect()
        .await
}

async fn corrupt_checkpoint(db: &Database, checkpoint_id: &str, column: &'static str) {
    let checkpoint_id = checkpoint_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                &format!("UPDATE checkpoints SET {column} = X'00FF00' WHERE checkpoint_id = ?1"),
                [checkpoint_id],
            )?;
            Ok(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn put_then_get_tuple_round_trips() {
    let (saver, _db) = saver().await;
    let config = ThreadConfig::new("shop#5511");
    let (cp, md) = checkpoint("c1", 0);

    let stored = saver
        .put(&config, &cp, &md, &ChannelVersions::new())
        .await
        .unwrap();
    assert_eq!(stored, ThreadConfig::new("shop#5511").with_checkpoint_id("c1"));

    let latest = saver.get_tuple(&config).await.unwrap().unwrap();
    assert_eq!(latest.checkpoint, cp);
    assert_eq!(latest.metadata, md);
    assert_eq!(latest.config, stored);
    assert!(latest.parent_config.is_none());
    assert!(latest.pending_writes.is_empty());

    let by_id = saver.get_tuple(&stored).await.unwrap().unwrap();
    assert_eq!(by_id.checkpoint, cp);
    assert_eq!(saver.get(&stored).await.unwrap(), Some(cp));
}

#[tokio::test]
async fn get_tuple_on_empty_thread_is_none() {
    let (saver, _db) = saver().await;
    assert!(saver.get_tuple(&ThreadConfig::new("nobody")).await.unwrap().is_none());
    let missing = ThreadConfig::new("nobody").with_checkpoint_id("c1");
    assert!(saver.get_tuple(&missing).await.unwrap().is_none());
}

#[tokio::test]
async fn parent_config_points_at_previous_checkpoint() {
    let (saver, _db) = saver().await;
    let last = put_chain(&saver, "t", &["c1", "c2"]).await;

    let tuple = saver.get_tuple(&last).await.unwrap().unwrap();
    assert_eq!(
        tuple.parent_config,
        Some(ThreadConfig::new("t").with_checkpoint_id("c1"))
    );
}

#[tokio::test]
async fn later_puts_are_listed_first_even_within_one_millisecond() {
    let (saver, _db) = saver().await;
    let config = put_chain(&saver, "t", &["c1", "c2", "c3", "c4"]).await;

    let ids = collect_ids(&saver, &ThreadConfig::new("t"), ListOptions::default()).await;
    assert_eq!(ids, ["c4", "c3", "c2", "c1"]);

    let latest = saver.get_tuple(&ThreadConfig::new("t")).await.unwrap().unwrap();
    assert_eq!(Some(latest.checkpoint.id), config.checkpoint_id);
}

#[tokio::test]
async fn list_pages_through_all_records() {
    let (saver, _db) = saver_with_page_size(2).await;
    put_chain(&saver, "t", &["c1", "c2", "c3", "c4", "c5"]).await;

    let ids = collect_ids(&saver, &ThreadConfig::new("t"), ListOptions::default()).await;
    assert_eq!(ids, ["c5", "c4", "c3", "c2", "c1"]);
}

#[tokio::test]
async fn pending_writes_come_back_ordered_by_task_then_index() {
    let (saver, _db) = saver().await;
    let config = put_chain(&saver, "t", &["c1"]).await;

    let writes_b: Vec<(String, Value)> = (0..12)
        .map(|i| ("messages".to_string(), json!(format!("b{i}"))))
        .collect();
    saver.put_writes(&config, &writes_b, "task-b", "").await.unwrap();
    saver
        .put_writes(
            &config,
            &[("route".to_string(), json!("cancel")), ("flag".to_string(), Value::Null)],
            "task-a",
            "",
        )
        .await
        .unwrap();
    // A replayed step rewrites identical records.
    saver.put_writes(&config, &writes_b, "task-b", "").await.unwrap();

    let tuple = saver.get_tuple(&config).await.unwrap().unwrap();
    let got: Vec<(String, String, Value)> = tuple
        .pending_writes
        .into_iter()
        .map(|w| (w.task_id, w.channel, w.value))
        .collect();

    let mut expected = vec![
        ("task-a".to_string(), "route".to_string(), json!("cancel")),
        ("task-a".to_string(), "flag".to_string(), Value::Null),
    ];
    expected.extend(
        (0..12).map(|i| ("task-b".to_string(), "messages".to_string(), json!(format!("b{i}")))),
    );
    assert_eq!(got, expected);
}

#[tokio::test]
async fn put_writes_without_checkpoint_id_fails() {
    let (saver, _db) = saver().await;
    let err = saver
        .put_writes(&ThreadConfig::new("t"), &[("c".into(), json!(1))], "task", "")
        .await
        .unwrap_err();
    assert!(matches!(err, ChatkeepError::MissingCheckpoint));
}

#[tokio::test]
async fn list_without_config_is_a_config_error() {
    let (saver, _db) = saver().await;
    let result = saver.list(None, ListOptions::default()).await;
    assert!(matches!(result, Err(ChatkeepError::Config(_))));
}

#[tokio::test]
async fn corrupt_record_is_skipped_in_list() {
    let (saver, db) = saver().await;
    put_chain(&saver, "t", &["c1", "c2", "c3", "c4", "c5"]).await;
    corrupt_checkpoint(&db, "c3", "checkpoint").await;

    let ids = collect_ids(&saver, &ThreadConfig::new("t"), ListOptions::default()).await;
    assert_eq!(ids, ["c5", "c4", "c2", "c1"]);

    // Fetching it directly surfaces the error instead.
    let direct = saver
        .get_tuple(&ThreadConfig::new("t").with_checkpoint_id("c3"))
        .await;
    assert!(matches!(direct, Err(ChatkeepError::Deserialization { .. })));
}

#[tokio::test]
async fn corrupt_metadata_falls_back_to_empty() {
    let (saver, db) = saver().await;
    let config = put_chain(&saver, "t", &["c1"]).await;
    corrupt_checkpoint(&db, "c1", "metadata").await;

    let tuple = saver.get_tuple(&config).await.unwrap().unwrap();
    assert_eq!(tuple.checkpoint.id, "c1");
    assert_eq!(tuple.metadata, CheckpointMetadata::default());
}

async fn execute(db: &Database, sql: &'static str) {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(sql)?;
            Ok(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn corrupt_pending_write_fails_get_tuple() {
    let (saver, db) = saver().await;
    let config = put_chain(&saver, "t", &["c1"]).await;
    saver
        .put_writes(&config, &[("messages".to_string(), json!("hi"))], "task", "")
        .await
        .unwrap();
    execute(&db, "UPDATE checkpoint_writes SET type = 'pickle'").await;

    let err = saver.get_tuple(&config).await.unwrap_err();
    assert!(matches!(err, ChatkeepError::Deserialization { .. }));
}

#[tokio::test]
async fn storage_failure_ends_list_with_one_error() {
    let (saver, db) = saver_with_page_size(1).await;
    put_chain(&saver, "t", &["c1", "c2", "c3"]).await;

    let mut stream = saver
        .list(Some(&ThreadConfig::new("t")), ListOptions::default())
        .await
        .unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.checkpoint.id, "c3");

    execute(&db, "DROP TABLE checkpoints").await;

    let failed = stream.next().await.unwrap();
    assert!(matches!(failed, Err(ChatkeepError::Storage { .. })));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn list_applies_filter_before_and_limit() {
    let (saver, _db) = saver().await;
    put_chain(&saver, "t", &["c0", "c1", "c2", "c3", "c4", "c5"]).await;
    let config = ThreadConfig::new("t");

    let filter = json!({"step": 2}).as_object().cloned();
    let ids = collect_ids(
        &saver,
        &config,
        ListOptions {
            filter,
            ..Default::default()
        },
    )
    .await;
    assert_eq!(ids, ["c2"]);

    let ids = collect_ids(
        &saver,
        &config,
        ListOptions {
            before: Some(ThreadConfig::new("t").with_checkpoint_id("c3")),
            limit: Some(2),
            ..Default::default()
        },
    )
    .await;
    assert_eq!(ids, ["c2", "c1"]);

    let ids = collect_ids(
        &saver,
        &config,
        ListOptions {
            before: Some(ThreadConfig::new("t").with_checkpoint_id("unknown")),
            ..Default::default()
        },
    )
    .await;
    assert!(ids.is_empty());
}

#[tokio::test]
async fn limit_counts_only_yielded_tuples() {
    let (saver, db) = saver().await;
    put_chain(&saver, "t", &["c1", "c2", "c3"]).await;
    corrupt_checkpoint(&db, "c3", "checkpoint").await;

    let ids = collect_ids(
        &saver,
        &ThreadConfig::new("t"),
        ListOptions {
            limit: Some(2),
            ..Default::default()
        },
    )
    .await;
    assert_eq!(ids, ["c2", "c1"]);
}

#[tokio::test]
async fn namespaces_are_listed_separately() {
    let (saver, _db) = saver().await;
    put_chain(&saver, "t", &["root1"]).await;
    let sub = ThreadConfig::new("t").with_namespace("subgraph");
    let (cp, md) = checkpoint("sub1", 0);
    let stored = saver.put(&sub, &cp, &md, &ChannelVersions::new()).await.unwrap();
    assert_eq!(stored.checkpoint_ns, "subgraph");

    assert_eq!(collect_ids(&saver, &sub, ListOptions::default()).await, ["sub1"]);
    assert_eq!(
        collect_ids(&saver, &ThreadConfig::new("t"), ListOptions::default()).await,
        ["root1"]
    );
}

#[tokio::test]
async fn amnesia_operations() {
    let (saver, _db) = saver().await;
    let a = put_chain(&saver, "shop#1", &["a1", "a2"]).await;
    put_chain(&saver, "shop#2", &["b1"]).await;
    saver
        .put_writes(&a, &[("messages".into(), json!("hi"))], "task", "")
        .await
        .unwrap();

    assert!(saver.has_checkpoint("shop#1").await.unwrap());
    assert_eq!(saver.delete_thread("shop#1").await.unwrap(), 3);
    assert!(!saver.has_checkpoint("shop#1").await.unwrap());
    assert!(saver.has_checkpoint("shop#2").await.unwrap());

    assert_eq!(saver.clear().await.unwrap(), 1);
    assert!(!saver.has_checkpoint("shop#2").await.unwrap());
}

#[tokio::test]
async fn checkpoints_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chatkeep.db");
    let path = path.to_str().unwrap();

    let db = Database::open(path).await.unwrap();
    let saver = SqliteCheckpointSaver::open(db.clone(), &storage_config(50)).await.unwrap();
    put_chain(&saver, "t", &["c1", "c2"]).await;
    db.close().await.unwrap();

    let db = Database::open(path).await.unwrap();
    let saver = SqliteCheckpointSaver::open(db, &storage_config(50)).await.unwrap();
    let latest = saver.get_tuple(&ThreadConfig::new("t")).await.unwrap().unwrap();
    assert_eq!(latest.checkpoint.id, "c2");
}

#[tokio::test]
async fn open_without_table_names_fails_fast() {
    let db = Database::open_in_memory().await.unwrap();
    let result = SqliteCheckpointSaver::open(db, &StorageConfig::default()).await;
    assert!(matches!(result, Err(ChatkeepError::Config(_))));
}
