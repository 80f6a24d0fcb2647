// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Re-renders every live presentation of a group against the store.
//!
//! Presentations can be deleted out-of-band at any time. A `NotFound` from
//! the surface is reconciled by dropping the stale view row; any other
//! per-view failure is logged and skipped so one bad message never blocks
//! the rest of the group.

use std::collections::HashMap;
use std::sync::Arc;

use tally_core::{ActiveView, Counter, CounterStore, GroupKey, ViewError, ViewSurface};
use tracing::{debug, info, warn};

use crate::stale::StaleViewPolicy;

/// Per-group refresh statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: usize,
    /// Views whose message was gone; their rows were deleted.
    pub removed: usize,
    pub failed: usize,
}

/// Startup reattachment statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReattachReport {
    pub refreshed: usize,
    pub removed: usize,
    /// Missing views the operator chose to keep.
    pub kept: usize,
    pub failed: usize,
}

pub struct Broadcaster {
    store: Arc<dyn CounterStore>,
    surface: Arc<dyn ViewSurface>,
}

impl Broadcaster {
    pub fn new(store: Arc<dyn CounterStore>, surface: Arc<dyn ViewSurface>) -> Self {
        Self { store, surface }
    }

    /// Re-render every view of `key`, passing `locked` through to the surface.
    pub async fn refresh_group(&self, key: &GroupKey, locked: bool) -> RefreshReport {
        let mut report = RefreshReport::default();

        let views = match self.store.list_active_views(key).await {
            Ok(views) => views,
            Err(e) => {
                warn!(group = %key, error = %e, "failed to load active views");
                return report;
            }
        };
        if views.is_empty() {
            return report;
        }

        let counters = match self.store.list_counters(key).await {
            Ok(counters) => counters,
            Err(e) => {
                warn!(group = %key, error = %e, "failed to load counters for refresh");
                report.failed = views.len();
                return report;
            }
        };

        debug!(group = %key, views = views.len(), locked, "refreshing group");
        for view in &views {
            match self.surface.refresh(view, &counters, locked).await {
                Ok(()) => report.refreshed += 1,
                Err(ViewError::NotFound) => {
                    self.forget(view).await;
                    report.removed += 1;
                }
                Err(ViewError::Other(e)) => {
                    warn!(
                        group = %key,
                        message_id = view.message_id,
                        error = %e,
                        "failed to refresh view"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Delete every presentation of `key` from the channel.
    ///
    /// Best-effort; returns how many messages were actually deleted. Rows are
    /// left to the store's group deletion.
    pub async fn purge_group(&self, key: &GroupKey) -> usize {
        let views = match self.store.list_active_views(key).await {
            Ok(views) => views,
            Err(e) => {
                warn!(group = %key, error = %e, "failed to load active views for purge");
                return 0;
            }
        };

        let mut deleted = 0;
        for view in &views {
            match self.surface.remove(view).await {
                Ok(()) => deleted += 1,
                Err(ViewError::NotFound) => {
                    debug!(message_id = view.message_id, "view already gone");
                }
                Err(ViewError::Other(e)) => {
                    warn!(
                        group = %key,
                        message_id = view.message_id,
                        error = %e,
                        "failed to delete view"
                    );
                }
            }
        }
        info!(group = %key, deleted, "purged group views");
        deleted
    }

    /// Re-render every tracked view once, at startup.
    ///
    /// Missing messages are handed to `policy`, which decides whether the row
    /// is dropped.
    pub async fn reattach_all(&self, policy: &dyn StaleViewPolicy) -> ReattachReport {
        let mut report = ReattachReport::default();

        let views = match self.store.list_all_active_views().await {
            Ok(views) => views,
            Err(e) => {
                warn!(error = %e, "failed to load active views for reattach");
                return report;
            }
        };
        info!(count = views.len(), "re-attaching active views");

        let mut counters_by_group: HashMap<GroupKey, Vec<Counter>> = HashMap::new();
        for view in &views {
            let key = view.group_key();
            if !counters_by_group.contains_key(&key) {
                match self.store.list_counters(&key).await {
                    Ok(counters) => {
                        counters_by_group.insert(key.clone(), counters);
                    }
                    Err(e) => {
                        warn!(group = %key, error = %e, "failed to load counters for reattach");
                        report.failed += 1;
                        continue;
                    }
                }
            }
            let counters = counters_by_group.get(&key).map(Vec::as_slice).unwrap_or(&[]);

            match self.surface.refresh(view, counters, false).await {
                Ok(()) => report.refreshed += 1,
                Err(ViewError::NotFound) => {
                    if policy.should_remove(view).await {
                        self.forget(view).await;
                        report.removed += 1;
                    } else {
                        info!(message_id = view.message_id, "keeping missing view on request");
                        report.kept += 1;
                    }
                }
                Err(ViewError::Other(e)) => {
                    warn!(message_id = view.message_id, error = %e, "failed to re-attach view");
                    report.failed += 1;
                }
            }
        }

        info!(
            refreshed = report.refreshed,
            removed = report.removed,
            kept = report.kept,
            failed = report.failed,
            "re-attach complete"
        );
        report
    }

    async fn forget(&self, view: &ActiveView) {
        info!(
            message_id = view.message_id,
            group = %view.group_key(),
            "view message is gone, removing record"
        );
        if let Err(e) = self.store.remove_active_view(view.message_id).await {
            warn!(message_id = view.message_id, error = %e, "failed to remove stale view");
        }
    }
}
