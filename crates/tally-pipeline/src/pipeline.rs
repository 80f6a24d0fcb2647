// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request admission: the producer-side handle to the mutation queue.

use std::sync::Arc;

use tally_core::{ActiveView, CounterStore, GroupKey, TallyError, ViewSurface};
use thiserror::Error;
use tracing::{debug, warn};

use crate::broadcast::Broadcaster;
use crate::job::Job;
use crate::queue::{job_queue, JobSender};
use crate::state::LedgerState;
use crate::worker::Worker;

/// Why a job was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The group has a refresh or mutation in flight.
    #[error("This group is being updated. Please wait...")]
    GroupBusy,

    /// The worker has stopped.
    #[error("the mutation queue is closed")]
    QueueClosed,
}

/// Cloneable handle used by event handlers to enqueue work.
#[derive(Clone)]
pub struct Pipeline {
    jobs: JobSender,
    state: Arc<LedgerState>,
    store: Arc<dyn CounterStore>,
    broadcaster: Arc<Broadcaster>,
}

impl Pipeline {
    /// Wire up a pipeline and the worker that consumes it.
    ///
    /// The worker must be spawned with [`Worker::run`] for jobs to execute.
    pub fn new(
        store: Arc<dyn CounterStore>,
        surface: Arc<dyn ViewSurface>,
        state: Arc<LedgerState>,
    ) -> (Self, Worker) {
        let (tx, rx) = job_queue();
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&store), surface));
        let worker = Worker::new(
            rx,
            Arc::clone(&store),
            Arc::clone(&broadcaster),
            Arc::clone(&state),
        );
        let pipeline = Self {
            jobs: tx,
            state,
            store,
            broadcaster,
        };
        (pipeline, worker)
    }

    /// Enqueue a job from a command without touching the lock table.
    pub fn submit(&self, job: Job) -> Result<(), AdmissionError> {
        debug!(job = job.mutation.action(), group = %job.group, "job submitted");
        self.jobs.send(job).map_err(|_| AdmissionError::QueueClosed)
    }

    /// Admit a job from an interactive control.
    ///
    /// Rejects immediately if the group is locked. Otherwise locks the group,
    /// renders its views locked, and enqueues the job, which carries the lock
    /// until the worker's cleanup.
    pub async fn admit(&self, mut job: Job) -> Result<(), AdmissionError> {
        let guard = self
            .state
            .locks
            .try_acquire(&job.group)
            .ok_or(AdmissionError::GroupBusy)?;
        let key = job.group.clone();

        self.broadcaster.refresh_group(&key, true).await;
        job.hold_lock(guard);

        if let Err(job) = self.jobs.send(job) {
            drop(job);
            warn!(group = %key, "queue closed during admission, unlocking group");
            self.broadcaster.refresh_group(&key, false).await;
            return Err(AdmissionError::QueueClosed);
        }
        debug!(group = %key, "job admitted");
        Ok(())
    }

    /// Track a newly posted presentation. Counts as a store mutation.
    pub async fn register_view(&self, view: &ActiveView) -> Result<(), TallyError> {
        self.store.add_active_view(view).await?;
        self.state.dirty.mark();
        Ok(())
    }

    pub fn is_locked(&self, key: &GroupKey) -> bool {
        self.state.locks.is_locked(key)
    }

    /// Jobs waiting for the worker.
    pub fn queue_len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty.is_set()
    }

    pub fn state(&self) -> &Arc<LedgerState> {
        &self.state
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }
}
