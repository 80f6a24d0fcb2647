// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store wrapper that injects failures into mutations.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tally_core::{
    ActiveView, AdapterType, Counter, CounterStore, Delta, GroupKey, HealthStatus,
    PluginAdapter, TallyError,
};

/// Delegates to a real store; mutations can be made to fail or panic.
pub struct FaultyStore {
    inner: Arc<dyn CounterStore>,
    fail_mutations: AtomicBool,
    panic_mutations: AtomicBool,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn CounterStore>) -> Self {
        Self {
            inner,
            fail_mutations: AtomicBool::new(false),
            panic_mutations: AtomicBool::new(false),
        }
    }

    /// Make counter mutations return a storage error.
    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Make counter mutations panic.
    pub fn panic_mutations(&self, panic: bool) {
        self.panic_mutations.store(panic, Ordering::SeqCst);
    }

    fn fault(&self) -> Result<(), TallyError> {
        if self.panic_mutations.load(Ordering::SeqCst) {
            panic!("injected store panic");
        }
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(TallyError::Storage {
                source: "injected store failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FaultyStore {
    fn name(&self) -> &str {
        "faulty-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl CounterStore for FaultyStore {
    async fn initialize(&self) -> Result<(), TallyError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), TallyError> {
        self.inner.close().await
    }

    async fn create_counter(&self, key: &GroupKey, name: &str) -> Result<(), TallyError> {
        self.fault()?;
        self.inner.create_counter(key, name).await
    }

    async fn update_counter(
        &self,
        key: &GroupKey,
        name: &str,
        delta: Delta,
    ) -> Result<(), TallyError> {
        self.fault()?;
        self.inner.update_counter(key, name, delta).await
    }

    async fn delete_counter(&self, key: &GroupKey, name: &str) -> Result<(), TallyError> {
        self.fault()?;
        self.inner.delete_counter(key, name).await
    }

    async fn delete_group(&self, key: &GroupKey) -> Result<(), TallyError> {
        self.fault()?;
        self.inner.delete_group(key).await
    }

    async fn list_counters(&self, key: &GroupKey) -> Result<Vec<Counter>, TallyError> {
        self.inner.list_counters(key).await
    }

    async fn list_group_names(
        &self,
        guild_id: u64,
        filter: Option<&str>,
    ) -> Result<Vec<String>, TallyError> {
        self.inner.list_group_names(guild_id, filter).await
    }

    async fn is_group_empty(&self, key: &GroupKey) -> Result<bool, TallyError> {
        self.inner.is_group_empty(key).await
    }

    async fn add_active_view(&self, view: &ActiveView) -> Result<(), TallyError> {
        self.inner.add_active_view(view).await
    }

    async fn remove_active_view(&self, message_id: u64) -> Result<(), TallyError> {
        self.inner.remove_active_view(message_id).await
    }

    async fn get_active_view(&self, message_id: u64) -> Result<Option<ActiveView>, TallyError> {
        self.inner.get_active_view(message_id).await
    }

    async fn list_active_views(&self, key: &GroupKey) -> Result<Vec<ActiveView>, TallyError> {
        self.inner.list_active_views(key).await
    }

    async fn list_all_active_views(&self) -> Result<Vec<ActiveView>, TallyError> {
        self.inner.list_all_active_views().await
    }

    async fn snapshot(&self, dest: &Path) -> Result<(), TallyError> {
        self.inner.snapshot(dest).await
    }
}
