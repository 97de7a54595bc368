// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Table bootstrap for the configured table names.
//!
//! Table names come from configuration, so each table is created on first
//! use with `CREATE TABLE IF NOT EXISTS` instead of a fixed migration set.

use chatkeep_config::model::StorageConfig;
use chatkeep_config::validation::is_sql_identifier;
use chatkeep_core::ChatkeepError;

use crate::database::{Database, map_tr_err};

/// Names of the two tables behind the checkpoint saver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointTables {
    pub checkpoints: String,
    pub writes: String,
}

impl CheckpointTables {
    /// Validated table names. Both must be SQL identifiers and differ.
    pub fn new(
        checkpoints: impl Into<String>,
        writes: impl Into<String>,
    ) -> Result<Self, ChatkeepError> {
        let tables = Self {
            checkpoints: checkpoint_ident(checkpoints.into())?,
            writes: checkpoint_ident(writes.into())?,
        };
        if tables.checkpoints.eq_ignore_ascii_case(&tables.writes) {
            return Err(ChatkeepError::Config(format!(
                "checkpoint and writes tables must differ, both are `{}`",
                tables.checkpoints
            )));
        }
        Ok(tables)
    }

    /// Table names from `[storage]`, failing fast when either is missing.
    pub fn from_config(config: &StorageConfig) -> Result<Self, ChatkeepError> {
        Self::new(
            config.require_checkpoint_table()?,
            config.require_writes_table()?,
        )
    }
}

fn checkpoint_ident(name: String) -> Result<String, ChatkeepError> {
    validated_table_name(&name)?;
    Ok(name)
}

/// Reject anything that cannot be interpolated into SQL as a bare table name.
pub fn validated_table_name(name: &str) -> Result<&str, ChatkeepError> {
    if is_sql_identifier(name) {
        Ok(name)
    } else {
        Err(ChatkeepError::Config(format!(
            "`{name}` is not a valid table name"
        )))
    }
}

/// Create the checkpoint and pending-write tables if they do not exist.
pub async fn ensure_checkpoint_tables(
    db: &Database,
    tables: &CheckpointTables,
) -> Result<(), ChatkeepError> {
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {cp} (
            thread_id TEXT NOT NULL,
            sort_key TEXT NOT NULL,
            checkpoint_id TEXT NOT NULL,
            parent_checkpoint_id TEXT,
            type TEXT NOT NULL,
            checkpoint BLOB NOT NULL,
            metadata BLOB NOT NULL,
            PRIMARY KEY (thread_id, sort_key)
        ) WITHOUT ROWID;
        CREATE INDEX IF NOT EXISTS idx_{cp}_checkpoint_id ON {cp}(thread_id, checkpoint_id);
        CREATE TABLE IF NOT EXISTS {wr} (
            thread_id TEXT NOT NULL,
            sort_key TEXT NOT NULL,
            task_id TEXT NOT NULL,
            task_path TEXT NOT NULL DEFAULT '',
            idx INTEGER NOT NULL,
            channel TEXT NOT NULL,
            type TEXT NOT NULL,
            value BLOB NOT NULL,
            PRIMARY KEY (thread_id, sort_key)
        ) WITHOUT ROWID;",
        cp = tables.checkpoints,
        wr = tables.writes,
    );
    execute_ddl(db, sql).await
}

/// Create the debounce buffer table if it does not exist.
pub async fn ensure_buffer_table(db: &Database, table: &str) -> Result<(), ChatkeepError> {
    let table = validated_table_name(table)?;
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            instance_name TEXT NOT NULL,
            cellphone_number TEXT NOT NULL,
            text TEXT NOT NULL,
            last_update INTEGER NOT NULL,
            execution_arn TEXT,
            PRIMARY KEY (instance_name, cellphone_number)
        ) WITHOUT ROWID;"
    );
    execute_ddl(db, sql).await
}

async fn execute_ddl(db: &Database, sql: String) -> Result<(), ChatkeepError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_exists(db: &Database, name: &str) -> bool {
        let name = name.to_string();
        db.connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [name],
                    |row| row.get::<_, i64>(0),
                )
                .map(|n| n == 1)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn creates_tables_idempotently() {
        let db = Database::open_in_memory().await.unwrap();
        let tables = CheckpointTables::new("checkpoints", "checkpoint_writes").unwrap();
        ensure_checkpoint_tables(&db, &tables).await.unwrap();
        ensure_checkpoint_tables(&db, &tables).await.unwrap();
        ensure_buffer_table(&db, "debounce_buffer").await.unwrap();

        assert!(table_exists(&db, "checkpoints").await);
        assert!(table_exists(&db, "checkpoint_writes").await);
        assert!(table_exists(&db, "debounce_buffer").await);
    }

    #[test]
    fn rejects_unsafe_names() {
        assert!(CheckpointTables::new("cp; DROP TABLE x", "writes").is_err());
        assert!(CheckpointTables::new("same", "SAME").is_err());
        assert!(validated_table_name("buffer-1").is_err());
    }

    #[test]
    fn from_config_requires_both_tables() {
        let mut config = StorageConfig {
            checkpoint_table: Some("checkpoints".into()),
            ..Default::default()
        };
        let err = CheckpointTables::from_config(&config).unwrap_err();
        assert!(matches!(err, ChatkeepError::Config(ref m) if m.contains("writes_table")));

        config.writes_table = Some("writes".into());
        let tables = CheckpointTables::from_config(&config).unwrap();
        assert_eq!(tables.writes, "writes");
    }
}
