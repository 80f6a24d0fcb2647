// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dirty-flag-gated mirroring of the store to remote storage.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tally_core::{CounterStore, RemoteMirror, TallyError};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::LedgerState;

/// What a startup pull found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The remote file was downloaded over the local database.
    Downloaded { id: String },
    /// No remote file; the local database is used (or created) as-is.
    Missing,
}

/// The local database file paired with its remote copy.
///
/// The remote identifier is looked up by name once and cached; a `NotFound`
/// on upload invalidates the cache.
pub struct MirroredDatabase {
    mirror: Arc<dyn RemoteMirror>,
    remote_name: String,
    local_path: PathBuf,
    remote_id: Mutex<Option<String>>,
}

impl MirroredDatabase {
    pub fn new(
        mirror: Arc<dyn RemoteMirror>,
        remote_name: impl Into<String>,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mirror,
            remote_name: remote_name.into(),
            local_path: local_path.into(),
            remote_id: Mutex::new(None),
        }
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// Replace the local database with the remote copy, if one exists.
    ///
    /// Must run before the store opens the file.
    pub async fn pull(&self) -> Result<PullOutcome, TallyError> {
        let mut cached = self.remote_id.lock().await;
        let Some(id) = self.mirror.find_by_name(&self.remote_name).await? else {
            warn!(
                name = %self.remote_name,
                "no remote database found, a new local database will be used"
            );
            return Ok(PullOutcome::Missing);
        };

        self.mirror.download(&id, &self.local_path).await?;
        self.discard_stale_journal().await?;
        info!(name = %self.remote_name, id = %id, "remote database downloaded");
        *cached = Some(id.clone());
        Ok(PullOutcome::Downloaded { id })
    }

    /// Upload a consistent snapshot of `store`.
    pub async fn push(&self, store: &dyn CounterStore) -> Result<String, TallyError> {
        let snapshot = self.snapshot_path();
        store.snapshot(&snapshot).await?;
        let result = self.upload(&snapshot).await;
        if let Err(e) = tokio::fs::remove_file(&snapshot).await {
            debug!(path = %snapshot.display(), error = %e, "failed to remove snapshot");
        }
        result
    }

    async fn upload(&self, snapshot: &Path) -> Result<String, TallyError> {
        let mut cached = self.remote_id.lock().await;
        if cached.is_none() {
            *cached = self.mirror.find_by_name(&self.remote_name).await?;
        }

        let id = match self
            .mirror
            .upload(snapshot, &self.remote_name, cached.as_deref())
            .await
        {
            Err(e) if e.is_not_found() => {
                warn!(name = %self.remote_name, "cached remote id is stale, looking it up again");
                *cached = None;
                let fresh = self.mirror.find_by_name(&self.remote_name).await?;
                self.mirror
                    .upload(snapshot, &self.remote_name, fresh.as_deref())
                    .await?
            }
            other => other?,
        };

        *cached = Some(id.clone());
        Ok(id)
    }

    /// Remove `-wal` and `-shm` files left by an unclean stop.
    ///
    /// SQLite would otherwise replay the old log onto the downloaded file.
    async fn discard_stale_journal(&self) -> Result<(), TallyError> {
        for suffix in ["-wal", "-shm"] {
            let path = self.sibling(suffix);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => warn!(path = %path.display(), "discarded stale SQLite journal"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(TallyError::Storage { source: Box::new(e) }),
            }
        }
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .local_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tally.db".into());
        name.push(suffix);
        self.local_path.with_file_name(name)
    }

    fn snapshot_path(&self) -> PathBuf {
        self.sibling(".upload")
    }
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing changed since the last upload.
    Clean,
    Uploaded { id: String },
    /// The upload failed; the flag was set again.
    Failed,
}

/// Periodically uploads the store when the dirty flag is set.
pub struct SyncScheduler {
    database: Arc<MirroredDatabase>,
    store: Arc<dyn CounterStore>,
    state: Arc<LedgerState>,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(
        database: Arc<MirroredDatabase>,
        store: Arc<dyn CounterStore>,
        state: Arc<LedgerState>,
        interval: Duration,
    ) -> Self {
        Self {
            database,
            store,
            state,
            interval,
        }
    }

    /// Upload once if dirty.
    ///
    /// The flag is cleared before the upload starts, so a mutation that
    /// commits mid-upload leaves it set for the next tick.
    pub async fn sync_once(&self) -> SyncOutcome {
        if !self.state.dirty.take() {
            debug!("store clean, skipping sync");
            return SyncOutcome::Clean;
        }

        match self.database.push(self.store.as_ref()).await {
            Ok(id) => {
                info!(name = %self.database.remote_name(), "database mirrored");
                SyncOutcome::Uploaded { id }
            }
            Err(e) => {
                self.state.dirty.mark();
                warn!(error = %e, "database sync failed, will retry next interval");
                SyncOutcome::Failed
            }
        }
    }

    /// Tick every interval until cancelled. The final flush is the caller's.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        info!(interval_secs = self.interval.as_secs(), "sync scheduler running");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sync_once().await;
                }
                _ = cancel.cancelled() => {
                    info!("sync scheduler stopped");
                    break;
                }
            }
        }
    }
}
