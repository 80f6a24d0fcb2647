// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide coordination state: the group lock table and the dirty flag.
//!
//! Both are reset on restart; nothing here is persisted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;
use tally_core::GroupKey;
use tracing::trace;

/// Set of groups with a refresh or mutation in flight.
///
/// The lock is advisory: it gates admission from interactive controls and
/// decides whether controls render disabled. It never blocks the worker.
#[derive(Debug, Clone, Default)]
pub struct GroupLocks {
    held: Arc<DashSet<GroupKey>>,
}

impl GroupLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `key` unless it is already locked.
    ///
    /// The returned guard releases the lock when dropped.
    pub fn try_acquire(&self, key: &GroupKey) -> Option<GroupLockGuard> {
        if self.held.insert(key.clone()) {
            trace!(group = %key, "group locked");
            Some(GroupLockGuard {
                locks: self.clone(),
                key: key.clone(),
            })
        } else {
            None
        }
    }

    pub fn is_locked(&self, key: &GroupKey) -> bool {
        self.held.contains(key)
    }

    /// Number of groups currently locked.
    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    fn release(&self, key: &GroupKey) {
        self.held.remove(key);
        trace!(group = %key, "group unlocked");
    }
}

/// Exclusive hold on one group's lock entry.
#[derive(Debug)]
pub struct GroupLockGuard {
    locks: GroupLocks,
    key: GroupKey,
}

impl GroupLockGuard {
    pub fn key(&self) -> &GroupKey {
        &self.key
    }
}

impl Drop for GroupLockGuard {
    fn drop(&mut self) {
        self.locks.release(&self.key);
    }
}

/// True when a store mutation has committed since the last successful upload.
#[derive(Debug, Default)]
pub struct DirtyFlag(AtomicBool);

impl DirtyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was set.
    ///
    /// A mutation that commits after this call sets the flag again, so clearing
    /// before an upload never hides a change from the next sync.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Shared coordination context handed to the pipeline, worker, and scheduler.
#[derive(Debug, Default)]
pub struct LedgerState {
    pub locks: GroupLocks,
    pub dirty: DirtyFlag,
}

impl LedgerState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}
