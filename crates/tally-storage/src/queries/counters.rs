// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Counter operations. Each mutation runs in its own transaction.

use rusqlite::{params, ErrorCode};
use tally_core::{Counter, Delta, GroupKey, TallyError};

use crate::database::Database;

/// Insert a new counter with value 0.
///
/// Returns [`TallyError::AlreadyExists`] when the (guild, group, name) triple
/// is already taken; the table is left unchanged.
pub async fn create_counter(db: &Database, key: &GroupKey, name: &str) -> Result<(), TallyError> {
    let guild_id = key.guild_id as i64;
    let group = key.group.clone();
    let counter = name.to_string();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let result = tx.execute(
                "INSERT INTO counters (guild_id, group_name, counter_name, value)
                 VALUES (?1, ?2, ?3, 0)",
                params![guild_id, group, counter],
            );
            match result {
                Ok(_) => {
                    tx.commit()?;
                    Ok(true)
                }
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(TallyError::AlreadyExists {
            group: key.group.clone(),
            name: name.to_string(),
        })
    }
}

/// Add `delta` to a counter's value. A missing counter is not an error.
pub async fn update_counter(
    db: &Database,
    key: &GroupKey,
    name: &str,
    delta: Delta,
) -> Result<(), TallyError> {
    let guild_id = key.guild_id as i64;
    let group = key.group.clone();
    let counter = name.to_string();
    let amount = delta.amount();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE counters SET value = value + ?1
                 WHERE guild_id = ?2 AND group_name = ?3 AND counter_name = ?4",
                params![amount, guild_id, group, counter],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete one counter. A missing counter is not an error.
pub async fn delete_counter(db: &Database, key: &GroupKey, name: &str) -> Result<(), TallyError> {
    let guild_id = key.guild_id as i64;
    let group = key.group.clone();
    let counter = name.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM counters
                 WHERE guild_id = ?1 AND group_name = ?2 AND counter_name = ?3",
                params![guild_id, group, counter],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete every counter and every active view of a group atomically.
pub async fn delete_group(db: &Database, key: &GroupKey) -> Result<(), TallyError> {
    let guild_id = key.guild_id as i64;
    let group = key.group.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM counters WHERE guild_id = ?1 AND group_name = ?2",
                params![guild_id, group],
            )?;
            tx.execute(
                "DELETE FROM active_views WHERE guild_id = ?1 AND group_name = ?2",
                params![guild_id, group],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a group's counters ordered by name.
pub async fn list_counters(db: &Database, key: &GroupKey) -> Result<Vec<Counter>, TallyError> {
    let guild_id = key.guild_id as i64;
    let group = key.group.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<Counter>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT counter_name, value FROM counters
                 WHERE guild_id = ?1 AND group_name = ?2
                 ORDER BY counter_name ASC",
            )?;
            let rows = stmt.query_map(params![guild_id, group], |row| {
                Ok(Counter {
                    name: row.get(0)?,
                    value: row.get(1)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Distinct group names of a guild, sorted. With `filter`, only that exact name.
pub async fn list_group_names(
    db: &Database,
    guild_id: u64,
    filter: Option<&str>,
) -> Result<Vec<String>, TallyError> {
    let guild_id = guild_id as i64;
    let filter = filter.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT group_name FROM counters
                 WHERE guild_id = ?1 AND (?2 IS NULL OR group_name = ?2)
                 ORDER BY group_name ASC",
            )?;
            let rows = stmt.query_map(params![guild_id, filter], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether the group has no counters.
pub async fn is_group_empty(db: &Database, key: &GroupKey) -> Result<bool, TallyError> {
    let guild_id = key.guild_id as i64;
    let group = key.group.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let exists: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM counters WHERE guild_id = ?1 AND group_name = ?2)",
                params![guild_id, group],
                |row| row.get(0),
            )?;
            Ok(!exists)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
