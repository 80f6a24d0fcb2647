// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! The initial schema uses `IF NOT EXISTS`, so a database file produced
//! before migrations were tracked is adopted as-is.

use tally_core::TallyError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), TallyError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| TallyError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
