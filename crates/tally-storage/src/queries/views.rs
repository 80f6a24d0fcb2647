// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Active view operations.

use rusqlite::params;
use tally_core::{ActiveView, GroupKey, TallyError};

use crate::database::Database;

fn row_to_view(row: &rusqlite::Row<'_>) -> Result<ActiveView, rusqlite::Error> {
    Ok(ActiveView {
        message_id: row.get::<_, i64>(0)? as u64,
        channel_id: row.get::<_, i64>(1)? as u64,
        guild_id: row.get::<_, i64>(2)? as u64,
        group_name: row.get(3)?,
    })
}

/// Insert a view, replacing any row with the same message id.
pub async fn add_active_view(db: &Database, view: &ActiveView) -> Result<(), TallyError> {
    let message_id = view.message_id as i64;
    let channel_id = view.channel_id as i64;
    let guild_id = view.guild_id as i64;
    let group = view.group_name.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO active_views (message_id, channel_id, guild_id, group_name)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (message_id) DO UPDATE SET
                    channel_id = excluded.channel_id,
                    guild_id = excluded.guild_id,
                    group_name = excluded.group_name",
                params![message_id, channel_id, guild_id, group],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn remove_active_view(db: &Database, message_id: u64) -> Result<(), TallyError> {
    let message_id = message_id as i64;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM active_views WHERE message_id = ?1",
                params![message_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_active_view(
    db: &Database,
    message_id: u64,
) -> Result<Option<ActiveView>, TallyError> {
    let message_id = message_id as i64;
    db.connection()
        .call(move |conn| -> Result<Option<ActiveView>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT message_id, channel_id, guild_id, group_name
                 FROM active_views WHERE message_id = ?1",
                params![message_id],
                row_to_view,
            );
            match result {
                Ok(view) => Ok(Some(view)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Views displaying one group, oldest message first.
pub async fn list_active_views(
    db: &Database,
    key: &GroupKey,
) -> Result<Vec<ActiveView>, TallyError> {
    let guild_id = key.guild_id as i64;
    let group = key.group.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<ActiveView>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT message_id, channel_id, guild_id, group_name
                 FROM active_views WHERE guild_id = ?1 AND group_name = ?2
                 ORDER BY message_id ASC",
            )?;
            let rows = stmt.query_map(params![guild_id, group], row_to_view)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_all_active_views(db: &Database) -> Result<Vec<ActiveView>, TallyError> {
    db.connection()
        .call(|conn| -> Result<Vec<ActiveView>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT message_id, channel_id, guild_id, group_name
                 FROM active_views ORDER BY message_id ASC",
            )?;
            let rows = stmt.query_map([], row_to_view)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
