// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Units of mutation work and their completion signals.

use strum::IntoStaticStr;
use tally_core::{Delta, GroupKey};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::state::GroupLockGuard;

/// Shown to users when a job fails for a reason other than a conflict.
pub const GENERIC_FAILURE: &str = "An unexpected database error occurred. Please try again.";

/// One mutation against a group. The group itself is carried by [`Job`].
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Mutation {
    CreateCounter { name: String },
    UpdateCounter { name: String, delta: Delta },
    DeleteCounter { name: String },
    DeleteGroup,
}

impl Mutation {
    /// Stable action tag used in logs.
    pub fn action(&self) -> &'static str {
        self.into()
    }
}

/// Recorded in a job's error slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// A validation failure, reported to the requester as a normal rejection.
    #[error("{0}")]
    Conflict(String),

    /// An unexpected failure. Detail is logged, not carried here.
    #[error("{0}")]
    Failed(String),
}

/// Result delivered through a job's completion signal.
pub type JobOutcome = Result<(), JobError>;

/// A queued mutation.
///
/// Owned by the queue until dequeued, then by the worker until it finishes.
/// Jobs are never retried or requeued.
#[derive(Debug)]
pub struct Job {
    pub group: GroupKey,
    pub mutation: Mutation,
    pub(crate) error: Option<JobError>,
    completion: Option<oneshot::Sender<JobOutcome>>,
    lock: Option<GroupLockGuard>,
}

impl Job {
    pub fn new(group: GroupKey, mutation: Mutation) -> Self {
        Self {
            group,
            mutation,
            error: None,
            completion: None,
            lock: None,
        }
    }

    pub fn create_counter(group: GroupKey, name: impl Into<String>) -> Self {
        Self::new(group, Mutation::CreateCounter { name: name.into() })
    }

    pub fn update_counter(group: GroupKey, name: impl Into<String>, delta: Delta) -> Self {
        Self::new(
            group,
            Mutation::UpdateCounter {
                name: name.into(),
                delta,
            },
        )
    }

    pub fn delete_counter(group: GroupKey, name: impl Into<String>) -> Self {
        Self::new(group, Mutation::DeleteCounter { name: name.into() })
    }

    pub fn delete_group(group: GroupKey) -> Self {
        Self::new(group, Mutation::DeleteGroup)
    }

    /// Attach a one-shot completion signal.
    pub fn with_completion(mut self) -> (Self, JobHandle) {
        let (tx, rx) = oneshot::channel();
        self.completion = Some(tx);
        (self, JobHandle { rx })
    }

    pub(crate) fn hold_lock(&mut self, guard: GroupLockGuard) {
        self.lock = Some(guard);
    }

    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    /// Cleanup: release the group lock, then fire the completion signal.
    pub(crate) fn finish(mut self) {
        drop(self.lock.take());
        if let Some(tx) = self.completion.take() {
            let outcome = match self.error.take() {
                Some(err) => Err(err),
                None => Ok(()),
            };
            // The requester may have stopped waiting.
            let _ = tx.send(outcome);
        }
    }
}

/// Receiving end of a job's completion signal.
#[derive(Debug)]
pub struct JobHandle {
    rx: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    /// Wait until the worker has executed the job and run its cleanup.
    pub async fn wait(self) -> JobOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(JobError::Failed(
                "the job was dropped before it completed".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GroupLocks;

    fn fruit() -> GroupKey {
        GroupKey::new(1, "fruit")
    }

    #[test]
    fn action_tags_are_kebab_case() {
        assert_eq!(Job::create_counter(fruit(), "a").mutation.action(), "create-counter");
        assert_eq!(
            Job::update_counter(fruit(), "a", Delta::Increment).mutation.action(),
            "update-counter"
        );
        assert_eq!(Job::delete_counter(fruit(), "a").mutation.action(), "delete-counter");
        assert_eq!(Job::delete_group(fruit()).mutation.action(), "delete-group");
    }

    #[tokio::test]
    async fn finish_delivers_error_slot() {
        let (mut job, handle) = Job::create_counter(fruit(), "apples").with_completion();
        job.error = Some(JobError::Conflict("taken".into()));
        job.finish();
        assert_eq!(handle.wait().await, Err(JobError::Conflict("taken".into())));
    }

    #[tokio::test]
    async fn finish_releases_lock_before_signalling() {
        let locks = GroupLocks::new();
        let (mut job, handle) = Job::delete_group(fruit()).with_completion();
        job.hold_lock(locks.try_acquire(&fruit()).unwrap());
        assert!(locks.is_locked(&fruit()));

        job.finish();
        handle.wait().await.unwrap();
        assert!(!locks.is_locked(&fruit()));
    }

    #[tokio::test]
    async fn dropped_job_reports_failure() {
        let (job, handle) = Job::delete_group(fruit()).with_completion();
        drop(job);
        assert!(matches!(handle.wait().await, Err(JobError::Failed(_))));
    }

    #[test]
    fn finish_without_completion_is_fine() {
        Job::delete_group(fruit()).finish();
    }
}
