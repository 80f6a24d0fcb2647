// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The serialized mutation pipeline.
//!
//! Every write to the counter store flows through one FIFO queue consumed by
//! a single [`Worker`]. Interactive admissions lock their group first, so a
//! group has at most one interactive job in flight and its presentations
//! render disabled until the worker's cleanup. A [`SyncScheduler`] mirrors
//! the store to remote storage whenever the dirty flag is set.

pub mod broadcast;
pub mod job;
pub mod pipeline;
pub mod queue;
pub mod stale;
pub mod state;
pub mod sync;
pub mod worker;

pub use broadcast::{Broadcaster, ReattachReport, RefreshReport};
pub use job::{Job, JobError, JobHandle, JobOutcome, Mutation, GENERIC_FAILURE};
pub use pipeline::{AdmissionError, Pipeline};
pub use stale::{AlwaysRemove, ConsolePrompt, StaleViewPolicy};
pub use state::{DirtyFlag, GroupLockGuard, GroupLocks, LedgerState};
pub use sync::{MirroredDatabase, PullOutcome, SyncOutcome, SyncScheduler};
pub use worker::Worker;
