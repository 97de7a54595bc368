// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending-write record operations.

use chatkeep_core::ChatkeepError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::queries::NamespaceRange;

/// One pending write, value still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRow {
    pub sort_key: String,
    pub task_id: String,
    pub idx: i64,
    pub channel: String,
    pub type_tag: String,
    pub value: Vec<u8>,
}

/// Insert-or-replace a task's writes in one transaction.
///
/// Replaying a step rewrites the same keys with the same content.
pub async fn upsert_batch(
    db: &Database,
    table: &str,
    thread_id: &str,
    task_path: &str,
    rows: Vec<WriteRow>,
) -> Result<(), ChatkeepError> {
    let sql = format!(
        "INSERT OR REPLACE INTO {table}
            (thread_id, sort_key, task_id, task_path, idx, channel, type, value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    );
    let thread_id = thread_id.to_string();
    let task_path = task_path.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(&sql)?;
                for row in &rows {
                    stmt.execute(params![
                        thread_id,
                        row.sort_key,
                        row.task_id,
                        task_path,
                        row.idx,
                        row.channel,
                        row.type_tag,
                        row.value,
                    ])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// All pending writes recorded against one checkpoint, in key order.
pub async fn for_checkpoint(
    db: &Database,
    table: &str,
    thread_id: &str,
    ns: &str,
    checkpoint_id: &str,
) -> Result<Vec<WriteRow>, ChatkeepError> {
    let sql = format!(
        "SELECT sort_key, task_id, idx, channel, type, value FROM {table}
         WHERE thread_id = ?1 AND sort_key >= ?2 AND sort_key < ?3
         ORDER BY sort_key"
    );
    let thread_id = thread_id.to_string();
    let range = NamespaceRange::writes(ns, checkpoint_id);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![thread_id, range.lower, range.upper], |row| {
                    Ok(WriteRow {
                        sort_key: row.get(0)?,
                        task_id: row.get(1)?,
                        idx: row.get(2)?,
                        channel: row.get(3)?,
                        type_tag: row.get(4)?,
                        value: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::write_sort_key;
    use crate::schema::{CheckpointTables, ensure_checkpoint_tables};

    fn write(cp: &str, task: &str, idx: usize, channel: &str) -> WriteRow {
        WriteRow {
            sort_key: write_sort_key("", cp, task, idx),
            task_id: task.to_string(),
            idx: idx as i64,
            channel: channel.to_string(),
            type_tag: "json".to_string(),
            value: b"1".to_vec(),
        }
    }

    #[tokio::test]
    async fn replayed_batch_overwrites_same_keys() {
        let db = Database::open_in_memory().await.unwrap();
        let tables = CheckpointTables::new("checkpoints", "writes").unwrap();
        ensure_checkpoint_tables(&db, &tables).await.unwrap();

        let batch = vec![write("cp1", "t1", 0, "messages"), write("cp1", "t1", 1, "route")];
        upsert_batch(&db, &tables.writes, "th", "", batch.clone()).await.unwrap();
        upsert_batch(&db, &tables.writes, "th", "", batch).await.unwrap();
        upsert_batch(&db, &tables.writes, "th", "", vec![write("cp2", "t1", 0, "x")])
            .await
            .unwrap();

        let rows = for_checkpoint(&db, &tables.writes, "th", "", "cp1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].channel, "messages");
        assert_eq!(rows[1].channel, "route");
    }
}
