// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Clones of [`Database`] share that thread; open one per process
//! and hand clones to the stores.

use std::path::Path;

use chatkeep_core::ChatkeepError;
use tracing::debug;

/// Convert a tokio-rusqlite error into `ChatkeepError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ChatkeepError {
    ChatkeepError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the SQLite database shared by the checkpoint saver and buffer store.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database file at `path` and apply connection pragmas.
    ///
    /// Missing parent directories are created.
    pub async fn open(path: &str) -> Result<Self, ChatkeepError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(ChatkeepError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(ChatkeepError::storage)?;
        let db = Self { conn };
        db.apply_pragmas(true).await?;
        debug!(path, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database. Used by tests and one-shot tooling.
    pub async fn open_in_memory() -> Result<Self, ChatkeepError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(ChatkeepError::storage)?;
        let db = Self { conn };
        db.apply_pragmas(false).await?;
        Ok(db)
    }

    async fn apply_pragmas(&self, wal: bool) -> Result<(), ChatkeepError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal {
                    // journal_mode returns a row, so it cannot go through execute_batch.
                    let _mode: String =
                        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
                    conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
                }
                conn.busy_timeout(std::time::Duration::from_secs(5))?;
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Round-trip a trivial statement to prove the connection thread is alive.
    pub async fn ping(&self) -> Result<(), ChatkeepError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Fold the WAL back into the main database file.
    pub async fn checkpoint_wal(&self) -> Result<(), ChatkeepError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Checkpoint the WAL and close the connection.
    ///
    /// Other clones of this handle fail with a storage error afterwards.
    pub async fn close(self) -> Result<(), ChatkeepError> {
        self.checkpoint_wal().await?;
        self.conn.close().await.map_err(ChatkeepError::storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("chatkeep.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_enables_wal() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("wal.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let mode = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn ping_after_close_fails() {
        let db = Database::open_in_memory().await.unwrap();
        let other = db.clone();
        db.ping().await.unwrap();
        db.close().await.unwrap();
        assert!(other.ping().await.is_err());
    }
}
