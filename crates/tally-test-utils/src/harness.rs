// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for pipeline integration tests.
//!
//! `PipelineHarness` assembles a temp SQLite store, a [`MockSurface`], and a
//! running worker, and offers helpers to drive jobs to completion.

use std::sync::Arc;

use tally_config::model::StorageConfig;
use tally_core::{ActiveView, CounterStore, GroupKey, TallyError};
use tally_pipeline::{Job, JobError, JobOutcome, LedgerState, Pipeline, Worker};
use tally_storage::SqliteStore;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::faulty_store::FaultyStore;
use crate::mock_surface::MockSurface;

/// Builder for [`PipelineHarness`].
pub struct PipelineHarnessBuilder {
    faulty: bool,
    start_worker: bool,
}

impl PipelineHarnessBuilder {
    /// Wrap the store in a [`FaultyStore`], reachable via [`PipelineHarness::faults`].
    pub fn with_faulty_store(mut self) -> Self {
        self.faulty = true;
        self
    }

    /// Leave the worker unstarted; call [`PipelineHarness::start_worker`] later.
    pub fn paused(mut self) -> Self {
        self.start_worker = false;
        self
    }

    pub async fn build(self) -> Result<PipelineHarness, TallyError> {
        let temp_dir = TempDir::new().map_err(|e| TallyError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("counters.db");

        let sqlite = SqliteStore::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        sqlite.initialize().await?;
        let sqlite: Arc<dyn CounterStore> = Arc::new(sqlite);

        let faults = self.faulty.then(|| Arc::new(FaultyStore::new(Arc::clone(&sqlite))));
        let store: Arc<dyn CounterStore> = match &faults {
            Some(f) => Arc::clone(f) as Arc<dyn CounterStore>,
            None => sqlite,
        };

        let surface = Arc::new(MockSurface::new());
        let state = LedgerState::new();
        let (pipeline, worker) = Pipeline::new(Arc::clone(&store), surface.clone(), state);

        let mut harness = PipelineHarness {
            pipeline,
            store,
            surface,
            faults,
            cancel: CancellationToken::new(),
            worker: Some(worker),
            worker_task: None,
            temp_dir,
        };
        if self.start_worker {
            harness.start_worker();
        }
        Ok(harness)
    }
}

/// A running pipeline over a temp database.
pub struct PipelineHarness {
    pub pipeline: Pipeline,
    pub store: Arc<dyn CounterStore>,
    pub surface: Arc<MockSurface>,
    faults: Option<Arc<FaultyStore>>,
    cancel: CancellationToken,
    worker: Option<Worker>,
    worker_task: Option<JoinHandle<()>>,
    temp_dir: TempDir,
}

impl PipelineHarness {
    pub fn builder() -> PipelineHarnessBuilder {
        PipelineHarnessBuilder {
            faulty: false,
            start_worker: true,
        }
    }

    /// Harness with a running worker and a plain SQLite store.
    pub async fn new() -> Result<Self, TallyError> {
        Self::builder().build().await
    }

    /// Spawn the worker if it has not been started.
    pub fn start_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.worker_task = Some(tokio::spawn(worker.run(self.cancel.clone())));
        }
    }

    /// The fault switchboard, if built with a faulty store.
    pub fn faults(&self) -> Option<&FaultyStore> {
        self.faults.as_deref()
    }

    /// Submit a job and wait for its outcome.
    pub async fn run(&self, job: Job) -> JobOutcome {
        let (job, handle) = job.with_completion();
        self.pipeline
            .submit(job)
            .map_err(|e| JobError::Failed(e.to_string()))?;
        handle.wait().await
    }

    /// Register a view row directly.
    pub async fn add_view(&self, message_id: u64, view_of: &GroupKey) {
        let view = ActiveView {
            message_id,
            channel_id: 100,
            guild_id: view_of.guild_id,
            group_name: view_of.group.clone(),
        };
        if let Err(e) = self.pipeline.register_view(&view).await {
            panic!("failed to register view {message_id}: {e}");
        }
    }

    pub fn temp_dir(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Cancel the worker, wait for it to drain, and close the store.
    pub async fn shutdown(mut self) -> Result<(), TallyError> {
        self.cancel.cancel();
        if let Some(task) = self.worker_task.take() {
            task.await
                .map_err(|e| TallyError::Internal(format!("worker task failed: {e}")))?;
        }
        self.store.close().await
    }
}
