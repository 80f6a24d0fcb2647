// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single consumer of the job queue.
//!
//! Jobs run strictly in enqueue order, one at a time. Whatever happens while
//! executing a job (success, conflict, store error, panic), the worker
//! refreshes the group unlocked, releases the group lock, and fires the
//! completion signal before taking the next job.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tally_core::{CounterStore, GroupKey, TallyError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::broadcast::Broadcaster;
use crate::job::{GENERIC_FAILURE, Job, JobError, Mutation};
use crate::queue::JobReceiver;
use crate::state::LedgerState;

pub struct Worker {
    jobs: JobReceiver,
    store: Arc<dyn CounterStore>,
    broadcaster: Arc<Broadcaster>,
    state: Arc<LedgerState>,
}

impl Worker {
    pub(crate) fn new(
        jobs: JobReceiver,
        store: Arc<dyn CounterStore>,
        broadcaster: Arc<Broadcaster>,
        state: Arc<LedgerState>,
    ) -> Self {
        Self {
            jobs,
            store,
            broadcaster,
            state,
        }
    }

    /// Run until `cancel` fires, then drain the jobs already queued.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("mutation worker running");

        loop {
            tokio::select! {
                job = self.jobs.recv() => match job {
                    Some(job) => self.process(job).await,
                    None => break,
                },
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, draining mutation queue");
                    break;
                }
            }
        }

        self.jobs.close();
        while let Some(job) = self.jobs.recv().await {
            self.process(job).await;
        }

        info!("mutation worker stopped");
    }

    /// Execute one job and run its cleanup.
    pub(crate) async fn process(&self, mut job: Job) {
        let action = job.mutation.action();
        debug!(job = action, group = %job.group, "executing job");

        let outcome = AssertUnwindSafe(self.execute(&job.group, &job.mutation))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => job.error = Some(e),
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(job = action, group = %job.group, panic = %detail, "job panicked");
                job.error = Some(JobError::Failed(GENERIC_FAILURE.to_string()));
            }
        }

        self.broadcaster.refresh_group(&job.group, false).await;
        job.finish();
    }

    async fn execute(&self, key: &GroupKey, mutation: &Mutation) -> Result<(), JobError> {
        match mutation {
            Mutation::CreateCounter { name } => match self.store.create_counter(key, name).await {
                Ok(()) => {
                    self.state.dirty.mark();
                    Ok(())
                }
                Err(e @ TallyError::AlreadyExists { .. }) => {
                    debug!(group = %key, counter = %name, "create rejected: already exists");
                    Err(JobError::Conflict(e.to_string()))
                }
                Err(e) => Err(self.failed(mutation, key, e)),
            },
            Mutation::UpdateCounter { name, delta } => {
                self.store
                    .update_counter(key, name, *delta)
                    .await
                    .map_err(|e| self.failed(mutation, key, e))?;
                // A no-op update of a missing counter still counts as a change.
                self.state.dirty.mark();
                Ok(())
            }
            Mutation::DeleteCounter { name } => {
                self.store
                    .delete_counter(key, name)
                    .await
                    .map_err(|e| self.failed(mutation, key, e))?;
                self.state.dirty.mark();
                Ok(())
            }
            Mutation::DeleteGroup => {
                // Messages first: once the rows are gone the views can no longer be found.
                self.broadcaster.purge_group(key).await;
                self.store
                    .delete_group(key)
                    .await
                    .map_err(|e| self.failed(mutation, key, e))?;
                self.state.dirty.mark();
                Ok(())
            }
        }
    }

    fn failed(&self, mutation: &Mutation, key: &GroupKey, e: TallyError) -> JobError {
        error!(job = mutation.action(), group = %key, error = %e, "job failed");
        JobError::Failed(GENERIC_FAILURE.to_string())
    }
}
