// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checkpoint record operations.

use chatkeep_core::ChatkeepError;
use rusqlite::{OptionalExtension, TransactionBehavior, params};

use crate::database::{Database, map_tr_err};
use crate::keys;
use crate::queries::{NamespaceRange, is_constraint_violation};
use crate::schema::CheckpointTables;

/// Attempts made to find a free sort key when concurrent writers collide.
const MAX_PUT_ATTEMPTS: u32 = 8;

/// A stored checkpoint record, payloads still encoded.
#[derive(Debug, Clone)]
pub struct CheckpointRow {
    pub sort_key: String,
    pub checkpoint_id: String,
    pub parent_checkpoint_id: Option<String>,
    pub type_tag: String,
    pub checkpoint: Vec<u8>,
    pub metadata: Vec<u8>,
}

/// A checkpoint about to be appended.
#[derive(Debug, Clone)]
pub struct NewCheckpoint {
    pub checkpoint_id: String,
    pub parent_checkpoint_id: Option<String>,
    pub type_tag: String,
    pub checkpoint: Vec<u8>,
    pub metadata: Vec<u8>,
}

const COLUMNS: &str = "sort_key, checkpoint_id, parent_checkpoint_id, type, checkpoint, metadata";

/// Restricts a query to one thread and exactly one namespace.
const NS_FILTER: &str = "thread_id = ?1 AND sort_key >= ?2 AND sort_key < ?3
     AND instr(substr(sort_key, ?4), '#') = 0";

fn row_to_checkpoint(row: &rusqlite::Row<'_>) -> rusqlite::Result<CheckpointRow> {
    Ok(CheckpointRow {
        sort_key: row.get(0)?,
        checkpoint_id: row.get(1)?,
        parent_checkpoint_id: row.get(2)?,
        type_tag: row.get(3)?,
        checkpoint: row.get(4)?,
        metadata: row.get(5)?,
    })
}

/// Most recent checkpoint of a namespace.
pub async fn latest(
    db: &Database,
    table: &str,
    thread_id: &str,
    ns: &str,
) -> Result<Option<CheckpointRow>, ChatkeepError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM {table} WHERE {NS_FILTER} ORDER BY sort_key DESC LIMIT 1"
    );
    let thread_id = thread_id.to_string();
    let range = NamespaceRange::checkpoints(ns);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &sql,
                params![thread_id, range.lower, range.upper, range.tail_start],
                row_to_checkpoint,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The checkpoint with a given id inside a namespace.
pub async fn by_id(
    db: &Database,
    table: &str,
    thread_id: &str,
    ns: &str,
    checkpoint_id: &str,
) -> Result<Option<CheckpointRow>, ChatkeepError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM {table} WHERE {NS_FILTER} AND checkpoint_id = ?5
         ORDER BY sort_key DESC LIMIT 1"
    );
    let thread_id = thread_id.to_string();
    let checkpoint_id = checkpoint_id.to_string();
    let range = NamespaceRange::checkpoints(ns);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &sql,
                params![
                    thread_id,
                    range.lower,
                    range.upper,
                    range.tail_start,
                    checkpoint_id
                ],
                row_to_checkpoint,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// One page of checkpoints, newest first, strictly older than `before_sort_key`.
pub async fn page(
    db: &Database,
    table: &str,
    thread_id: &str,
    ns: &str,
    before_sort_key: Option<&str>,
    limit: usize,
) -> Result<Vec<CheckpointRow>, ChatkeepError> {
    let range = NamespaceRange::checkpoints(ns);
    // The cursor only ever tightens the upper bound.
    let upper = match before_sort_key {
        Some(cursor) if cursor < range.upper.as_str() => cursor.to_string(),
        _ => range.upper.clone(),
    };
    let sql = format!(
        "SELECT {COLUMNS} FROM {table} WHERE {NS_FILTER} ORDER BY sort_key DESC LIMIT ?5"
    );
    let thread_id = thread_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![thread_id, range.lower, upper, range.tail_start, limit],
                    row_to_checkpoint,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Append a checkpoint and return its sort key.
///
/// The key's millis are `max(now_ms, latest + 1)` within one immediate
/// transaction, so keys of a namespace strictly increase. A primary-key
/// collision with another process bumps the millis and retries.
pub async fn insert(
    db: &Database,
    table: &str,
    thread_id: &str,
    ns: &str,
    record: NewCheckpoint,
    now_ms: u64,
) -> Result<String, ChatkeepError> {
    let latest_sql = format!(
        "SELECT sort_key FROM {table} WHERE {NS_FILTER} ORDER BY sort_key DESC LIMIT 1"
    );
    let insert_sql = format!(
        "INSERT INTO {table} (thread_id, {COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
    );
    let thread_id = thread_id.to_string();
    let ns = ns.to_string();
    db.connection()
        .call(move |conn| {
            let range = NamespaceRange::checkpoints(&ns);
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let latest: Option<String> = tx
                .query_row(
                    &latest_sql,
                    params![thread_id, range.lower, range.upper, range.tail_start],
                    |row| row.get(0),
                )
                .optional()?;
            let mut millis = match latest.as_deref().and_then(keys::checkpoint_millis) {
                Some(last) => now_ms.max(last + 1),
                None => now_ms,
            };

            let mut attempt = 1;
            let sort_key = loop {
                let sort_key = keys::checkpoint_sort_key(&ns, millis);
                match tx.execute(
                    &insert_sql,
                    params![
                        thread_id,
                        sort_key,
                        record.checkpoint_id,
                        record.parent_checkpoint_id,
                        record.type_tag,
                        record.checkpoint,
                        record.metadata,
                    ],
                ) {
                    Ok(_) => break sort_key,
                    Err(e) if is_constraint_violation(&e) && attempt < MAX_PUT_ATTEMPTS => {
                        attempt += 1;
                        millis += 1;
                    }
                    Err(e) => return Err(e),
                }
            };
            tx.commit()?;
            Ok(sort_key)
        })
        .await
        .map_err(map_tr_err)
}

/// Whether the thread has at least one checkpoint in any namespace.
pub async fn thread_exists(
    db: &Database,
    table: &str,
    thread_id: &str,
) -> Result<bool, ChatkeepError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE thread_id = ?1)");
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| conn.query_row(&sql, params![thread_id], |row| row.get(0)))
        .await
        .map_err(map_tr_err)
}

/// Delete every checkpoint and pending write of one thread. Returns rows removed.
pub async fn delete_thread(
    db: &Database,
    tables: &CheckpointTables,
    thread_id: &str,
) -> Result<u64, ChatkeepError> {
    let statements = [
        format!("DELETE FROM {} WHERE thread_id = ?1", tables.writes),
        format!("DELETE FROM {} WHERE thread_id = ?1", tables.checkpoints),
    ];
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut removed = 0u64;
            for sql in &statements {
                removed += tx.execute(sql, params![thread_id])? as u64;
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every checkpoint and pending write. Returns rows removed.
pub async fn clear(db: &Database, tables: &CheckpointTables) -> Result<u64, ChatkeepError> {
    let statements = [
        format!("DELETE FROM {}", tables.writes),
        format!("DELETE FROM {}", tables.checkpoints),
    ];
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut removed = 0u64;
            for sql in &statements {
                removed += tx.execute(sql, [])? as u64;
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ensure_checkpoint_tables;

    async fn setup_db() -> (Database, CheckpointTables) {
        let db = Database::open_in_memory().await.unwrap();
        let tables = CheckpointTables::new("checkpoints", "writes").unwrap();
        ensure_checkpoint_tables(&db, &tables).await.unwrap();
        (db, tables)
    }

    fn record(id: &str) -> NewCheckpoint {
        NewCheckpoint {
            checkpoint_id: id.to_string(),
            parent_checkpoint_id: None,
            type_tag: "json".to_string(),
            checkpoint: b"{}".to_vec(),
            metadata: b"{}".to_vec(),
        }
    }

    #[tokio::test]
    async fn same_millisecond_inserts_get_increasing_keys() {
        let (db, tables) = setup_db().await;
        let t = &tables.checkpoints;
        let k1 = insert(&db, t, "th", "", record("a"), 1_000).await.unwrap();
        let k2 = insert(&db, t, "th", "", record("b"), 1_000).await.unwrap();
        let k3 = insert(&db, t, "th", "", record("c"), 999).await.unwrap();
        assert_eq!(keys::checkpoint_millis(&k1), Some(1_000));
        assert_eq!(keys::checkpoint_millis(&k2), Some(1_001));
        assert_eq!(keys::checkpoint_millis(&k3), Some(1_002));
    }

    #[tokio::test]
    async fn namespaces_do_not_leak_into_each_other() {
        let (db, tables) = setup_db().await;
        let t = &tables.checkpoints;
        insert(&db, t, "th", "a", record("in-a"), 10).await.unwrap();
        insert(&db, t, "th", "a#b", record("in-ab"), 20).await.unwrap();
        insert(&db, t, "th", "", record("in-root"), 30).await.unwrap();

        let latest_a = latest(&db, t, "th", "a").await.unwrap().unwrap();
        assert_eq!(latest_a.checkpoint_id, "in-a");
        let rows = page(&db, t, "th", "a", None, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(by_id(&db, t, "th", "a", "in-ab").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn page_walks_backwards_from_cursor() {
        let (db, tables) = setup_db().await;
        let t = &tables.checkpoints;
        for (i, id) in ["c1", "c2", "c3", "c4"].iter().enumerate() {
            insert(&db, t, "th", "", record(id), 100 + i as u64).await.unwrap();
        }
        let first = page(&db, t, "th", "", None, 2).await.unwrap();
        let ids: Vec<_> = first.iter().map(|r| r.checkpoint_id.as_str()).collect();
        assert_eq!(ids, ["c4", "c3"]);

        let second = page(&db, t, "th", "", Some(&first[1].sort_key), 2).await.unwrap();
        let ids: Vec<_> = second.iter().map(|r| r.checkpoint_id.as_str()).collect();
        assert_eq!(ids, ["c2", "c1"]);
    }

    #[tokio::test]
    async fn delete_thread_leaves_other_threads() {
        let (db, tables) = setup_db().await;
        let t = &tables.checkpoints;
        insert(&db, t, "keep", "", record("k"), 1).await.unwrap();
        insert(&db, t, "drop", "", record("d1"), 1).await.unwrap();
        insert(&db, t, "drop", "sub", record("d2"), 1).await.unwrap();

        assert_eq!(delete_thread(&db, &tables, "drop").await.unwrap(), 2);
        assert!(!thread_exists(&db, t, "drop").await.unwrap());
        assert!(thread_exists(&db, t, "keep").await.unwrap());

        assert_eq!(clear(&db, &tables).await.unwrap(), 1);
        assert!(!thread_exists(&db, t, "keep").await.unwrap());
    }
}
