// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the CounterStore trait.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use tally_config::model::StorageConfig;
use tally_core::{
    ActiveView, AdapterType, Counter, CounterStore, Delta, GroupKey, HealthStatus,
    PluginAdapter, TallyError,
};

use crate::database::{checkpoint, Database};
use crate::queries::{counters, views};

/// SQLite-backed counter store.
///
/// The database is opened on the first call to [`CounterStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, TallyError> {
        self.db.get().ok_or_else(|| TallyError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        if let Some(db) = self.db.get() {
            checkpoint(db.connection()).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for SqliteStore {
    async fn initialize(&self) -> Result<(), TallyError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| TallyError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), TallyError> {
        checkpoint(self.db()?.connection()).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn create_counter(&self, key: &GroupKey, name: &str) -> Result<(), TallyError> {
        counters::create_counter(self.db()?, key, name).await
    }

    async fn update_counter(
        &self,
        key: &GroupKey,
        name: &str,
        delta: Delta,
    ) -> Result<(), TallyError> {
        counters::update_counter(self.db()?, key, name, delta).await
    }

    async fn delete_counter(&self, key: &GroupKey, name: &str) -> Result<(), TallyError> {
        counters::delete_counter(self.db()?, key, name).await
    }

    async fn delete_group(&self, key: &GroupKey) -> Result<(), TallyError> {
        counters::delete_group(self.db()?, key).await
    }

    async fn list_counters(&self, key: &GroupKey) -> Result<Vec<Counter>, TallyError> {
        counters::list_counters(self.db()?, key).await
    }

    async fn list_group_names(
        &self,
        guild_id: u64,
        filter: Option<&str>,
    ) -> Result<Vec<String>, TallyError> {
        counters::list_group_names(self.db()?, guild_id, filter).await
    }

    async fn is_group_empty(&self, key: &GroupKey) -> Result<bool, TallyError> {
        counters::is_group_empty(self.db()?, key).await
    }

    async fn add_active_view(&self, view: &ActiveView) -> Result<(), TallyError> {
        views::add_active_view(self.db()?, view).await
    }

    async fn remove_active_view(&self, message_id: u64) -> Result<(), TallyError> {
        views::remove_active_view(self.db()?, message_id).await
    }

    async fn get_active_view(&self, message_id: u64) -> Result<Option<ActiveView>, TallyError> {
        views::get_active_view(self.db()?, message_id).await
    }

    async fn list_active_views(&self, key: &GroupKey) -> Result<Vec<ActiveView>, TallyError> {
        views::list_active_views(self.db()?, key).await
    }

    async fn list_all_active_views(&self) -> Result<Vec<ActiveView>, TallyError> {
        views::list_all_active_views(self.db()?).await
    }

    async fn snapshot(&self, dest: &Path) -> Result<(), TallyError> {
        self.db()?.snapshot(dest).await
    }
}
