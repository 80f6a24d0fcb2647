// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tally counter bot.

use thiserror::Error;

/// The primary error type used across all Tally adapter traits and core operations.
#[derive(Debug, Error)]
pub enum TallyError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migrations).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A counter with the same (guild, group, name) triple already exists.
    #[error("A counter named `{name}` already exists in group `{group}`.")]
    AlreadyExists { group: String, name: String },

    /// A remote object (mirror file, channel message) does not exist anymore.
    #[error("not found: {0}")]
    NotFound(String),

    /// Chat channel errors (gateway failure, HTTP error, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Remote mirror errors (authentication, transfer failure).
    #[error("mirror error: {message}")]
    Mirror {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TallyError {
    /// Returns `true` for [`TallyError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, TallyError::NotFound(_))
    }
}

/// Outcome of an operation on one external presentation.
///
/// A presentation may be deleted out-of-band at any time, so "gone" is an
/// expected result that callers reconcile against, not a failure.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The presentation no longer exists on the remote channel.
    #[error("presentation not found")]
    NotFound,

    /// Any other failure while fetching, editing, or deleting.
    #[error(transparent)]
    Other(#[from] TallyError),
}
