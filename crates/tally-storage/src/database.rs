// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread, which is
//! the only writer. Do NOT open additional connections for writes.

use std::path::Path;
use std::time::Duration;

use tally_core::TallyError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into `TallyError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TallyError {
    TallyError::Storage {
        source: Box::new(e),
    }
}

/// Unwrap a `TallyError` raised inside a connection closure.
fn map_tr_tally_err(e: tokio_rusqlite::Error<TallyError>) -> TallyError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => TallyError::Storage {
            source: other.to_string().into(),
        },
    }
}

/// Handle to the single SQLite connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs and migrations.
    pub async fn open(path: impl AsRef<Path>, wal_mode: bool) -> Result<Self, TallyError> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| TallyError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), TallyError> {
            configure(conn, wal_mode).map_err(|e| TallyError::Storage {
                source: Box::new(e),
            })?;
            run_migrations(conn)
        })
        .await
        .map_err(map_tr_tally_err)?;

        debug!(path = %path.display(), wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying connection. Queries go through `connection().call(..)`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Copy the whole database to `dest` with the online-backup API.
    ///
    /// The copy is a single consistent file even while WAL frames are pending.
    /// An existing file at `dest` is replaced.
    pub async fn snapshot(&self, dest: impl AsRef<Path>) -> Result<(), TallyError> {
        let dest = dest.as_ref().to_path_buf();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let mut dst = rusqlite::Connection::open(&dest)?;
                let backup = rusqlite::backup::Backup::new(conn, &mut dst)?;
                backup.run_to_completion(100, Duration::from_millis(10), None)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), TallyError> {
        checkpoint(&self.conn).await?;
        self.conn.close().await.map_err(map_tr_err)
    }
}

fn configure(conn: &mut rusqlite::Connection, wal_mode: bool) -> Result<(), rusqlite::Error> {
    if wal_mode {
        // journal_mode returns a row, so it cannot go through execute_batch.
        conn.pragma_update(None, "journal_mode", "WAL")?;
    }
    conn.busy_timeout(Duration::from_millis(5000))?;
    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )?;
    Ok(())
}

/// Fold the WAL back into the main database file.
pub(crate) async fn checkpoint(conn: &tokio_rusqlite::Connection) -> Result<(), TallyError> {
    conn.call(|conn| -> Result<(), rusqlite::Error> {
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    })
    .await
    .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_both_tables() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db"), true).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table'
                     AND name IN ('counters', 'active_views') ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();

        assert_eq!(tables, vec!["active_views", "counters"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_is_applied() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("wal.db"), true).await.unwrap();

        let mode: String = db
            .connection()
            .call(|conn| conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_is_a_readable_copy() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("live.db"), true).await.unwrap();
        db.connection()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO counters (guild_id, group_name, counter_name) VALUES (1, 'g', 'c')",
                    [],
                )
            })
            .await
            .unwrap();

        let copy = dir.path().join("copy.db");
        db.snapshot(&copy).await.unwrap();
        db.close().await.unwrap();

        let conn = rusqlite::Connection::open(&copy).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM counters", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("again.db");
        Database::open(&path, true).await.unwrap().close().await.unwrap();
        let db = Database::open(&path, true).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn adopts_unmigrated_database_with_same_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE counters (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    guild_id INTEGER NOT NULL,
                    group_name TEXT NOT NULL,
                    counter_name TEXT NOT NULL,
                    value INTEGER NOT NULL DEFAULT 0,
                    UNIQUE (guild_id, group_name, counter_name));
                 CREATE TABLE active_views (
                    message_id INTEGER PRIMARY KEY,
                    channel_id INTEGER NOT NULL,
                    guild_id INTEGER NOT NULL,
                    group_name TEXT NOT NULL);
                 INSERT INTO counters (guild_id, group_name, counter_name, value)
                    VALUES (1, 'fruit', 'apples', 3);",
            )
            .unwrap();
        }

        let db = Database::open(&path, true).await.unwrap();
        let value: i64 = db
            .connection()
            .call(|conn| conn.query_row("SELECT value FROM counters", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(value, 3);
        db.close().await.unwrap();
    }
}
