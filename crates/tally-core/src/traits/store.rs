// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Counter store trait for the durable ledger.

use std::path::Path;

use async_trait::async_trait;

use crate::error::TallyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ActiveView, Counter, Delta, GroupKey};

/// Durable CRUD over counters and active views.
///
/// Every mutating call commits atomically or not at all; callers never
/// observe the partial effect of one call.
#[async_trait]
pub trait CounterStore: PluginAdapter {
    /// Opens the backend and creates the schema if absent.
    async fn initialize(&self) -> Result<(), TallyError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), TallyError>;

    /// Creates a counter with value 0.
    ///
    /// Fails with [`TallyError::AlreadyExists`] if the triple is taken.
    async fn create_counter(&self, key: &GroupKey, name: &str) -> Result<(), TallyError>;

    /// Applies `delta` to a counter. Missing counters are left alone.
    async fn update_counter(&self, key: &GroupKey, name: &str, delta: Delta)
        -> Result<(), TallyError>;

    /// Deletes a counter. Missing counters are left alone.
    async fn delete_counter(&self, key: &GroupKey, name: &str) -> Result<(), TallyError>;

    /// Deletes every counter and every active view of a group in one transaction.
    async fn delete_group(&self, key: &GroupKey) -> Result<(), TallyError>;

    /// Lists a group's counters sorted by name.
    async fn list_counters(&self, key: &GroupKey) -> Result<Vec<Counter>, TallyError>;

    /// Lists the distinct group names of a guild, optionally restricted to one name.
    async fn list_group_names(
        &self,
        guild_id: u64,
        filter: Option<&str>,
    ) -> Result<Vec<String>, TallyError>;

    async fn is_group_empty(&self, key: &GroupKey) -> Result<bool, TallyError>;

    /// Inserts or replaces the active view addressed by `view.message_id`.
    async fn add_active_view(&self, view: &ActiveView) -> Result<(), TallyError>;

    async fn remove_active_view(&self, message_id: u64) -> Result<(), TallyError>;

    async fn get_active_view(&self, message_id: u64) -> Result<Option<ActiveView>, TallyError>;

    async fn list_active_views(&self, key: &GroupKey) -> Result<Vec<ActiveView>, TallyError>;

    async fn list_all_active_views(&self) -> Result<Vec<ActiveView>, TallyError>;

    /// Writes a consistent copy of the whole store to `dest`.
    async fn snapshot(&self, dest: &Path) -> Result<(), TallyError>;
}
