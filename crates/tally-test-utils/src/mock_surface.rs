// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock view surface that records every call.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tally_core::{
    ActiveView, AdapterType, Counter, HealthStatus, PluginAdapter, TallyError, ViewError,
    ViewSurface,
};

/// One recorded `refresh` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCall {
    pub message_id: u64,
    pub counters: Vec<Counter>,
    pub locked: bool,
}

/// A surface where messages can be marked missing or failing.
///
/// Missing messages answer `NotFound`; failing ones answer a channel error.
#[derive(Default)]
pub struct MockSurface {
    refreshes: Mutex<Vec<RefreshCall>>,
    removed: Mutex<Vec<u64>>,
    missing: Mutex<HashSet<u64>>,
    failing: Mutex<HashSet<u64>>,
}

impl MockSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the message being deleted out-of-band.
    pub fn mark_missing(&self, message_id: u64) {
        lock(&self.missing).insert(message_id);
    }

    pub fn mark_failing(&self, message_id: u64) {
        lock(&self.failing).insert(message_id);
    }

    pub fn refreshes(&self) -> Vec<RefreshCall> {
        lock(&self.refreshes).clone()
    }

    /// Refreshes of one message, oldest first.
    pub fn refreshes_of(&self, message_id: u64) -> Vec<RefreshCall> {
        lock(&self.refreshes)
            .iter()
            .filter(|c| c.message_id == message_id)
            .cloned()
            .collect()
    }

    pub fn removed(&self) -> Vec<u64> {
        lock(&self.removed).clone()
    }

    pub fn clear(&self) {
        lock(&self.refreshes).clear();
        lock(&self.removed).clear();
    }

    fn check(&self, message_id: u64) -> Result<(), ViewError> {
        if lock(&self.missing).contains(&message_id) {
            return Err(ViewError::NotFound);
        }
        if lock(&self.failing).contains(&message_id) {
            return Err(ViewError::Other(TallyError::Channel {
                message: format!("mock failure for message {message_id}"),
                source: None,
            }));
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PluginAdapter for MockSurface {
    fn name(&self) -> &str {
        "mock-surface"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Surface
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        Ok(())
    }
}

#[async_trait]
impl ViewSurface for MockSurface {
    async fn refresh(
        &self,
        view: &ActiveView,
        counters: &[Counter],
        locked: bool,
    ) -> Result<(), ViewError> {
        self.check(view.message_id)?;
        lock(&self.refreshes).push(RefreshCall {
            message_id: view.message_id,
            counters: counters.to_vec(),
            locked,
        });
        Ok(())
    }

    async fn remove(&self, view: &ActiveView) -> Result<(), ViewError> {
        self.check(view.message_id)?;
        lock(&self.removed).push(view.message_id);
        Ok(())
    }
}
