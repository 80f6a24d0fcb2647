// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tally backup` command implementation.
//!
//! Uses rusqlite's Backup API, so the copy is consistent even while a running
//! bot writes to the database in WAL mode.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use tally_core::TallyError;

fn storage_err(e: impl std::error::Error + Send + Sync + 'static) -> TallyError {
    TallyError::Storage {
        source: Box::new(e),
    }
}

/// Copy the SQLite database at `db_path` to `backup_path`.
pub fn run_backup(db_path: &str, backup_path: &str) -> Result<(), TallyError> {
    if !Path::new(db_path).exists() {
        return Err(storage_err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("database not found: {db_path}"),
        )));
    }

    let src = Connection::open_with_flags(
        db_path,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(storage_err)?;
    let mut dst = Connection::open(backup_path).map_err(storage_err)?;

    let backup = rusqlite::backup::Backup::new(&src, &mut dst).map_err(storage_err)?;
    // 100 pages per step with a 10ms pause lets the running bot keep writing.
    backup
        .run_to_completion(100, Duration::from_millis(10), None)
        .map_err(storage_err)?;

    let metadata = std::fs::metadata(backup_path).map_err(storage_err)?;
    let size_kb = metadata.len() as f64 / 1024.0;
    eprintln!("Backup complete: {size_kb:.1} KB written to {backup_path}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("absent.db");
        let dst = dir.path().join("copy.db");
        let err = run_backup(src.to_str().unwrap(), dst.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(!dst.exists());
    }

    #[test]
    fn copy_contains_the_counters() {
        let dir = tempfile::tempdir().unwrap();
        let src_path = dir.path().join("counters.db");
        let backup_path = dir.path().join("copy.db");

        let conn = Connection::open(&src_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE counters (id INTEGER PRIMARY KEY, guild_id INTEGER, group_name TEXT,
                                    counter_name TEXT, value INTEGER);
             INSERT INTO counters VALUES (1, 7, 'fruit', 'apples', 3);
             INSERT INTO counters VALUES (2, 7, 'fruit', 'pears', -1);",
        )
        .unwrap();
        drop(conn);

        run_backup(src_path.to_str().unwrap(), backup_path.to_str().unwrap()).unwrap();

        let copy = Connection::open(&backup_path).unwrap();
        let total: i64 = copy
            .query_row("SELECT SUM(value) FROM counters", [], |row| row.get(0))
            .unwrap();
        assert_eq!(total, 2);
    }
}
