// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unbounded FIFO of jobs with a single consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;

use crate::job::Job;

/// Create a connected queue pair.
pub fn job_queue() -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        JobSender {
            tx,
            depth: Arc::clone(&depth),
        },
        JobReceiver { rx, depth },
    )
}

/// Producer side. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobSender {
    tx: mpsc::UnboundedSender<Job>,
    depth: Arc<AtomicUsize>,
}

impl JobSender {
    /// Append a job. Hands the job back if the consumer is gone.
    pub fn send(&self, job: Job) -> Result<(), Job> {
        self.depth.fetch_add(1, Ordering::AcqRel);
        self.tx.send(job).map_err(|mpsc::error::SendError(job)| {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            job
        })
    }

    /// Jobs enqueued and not yet dequeued.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, owned by the worker.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<Job>,
    depth: Arc<AtomicUsize>,
}

impl JobReceiver {
    /// Wait for the next job; `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<Job> {
        let job = self.rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::AcqRel);
        Some(job)
    }

    /// Stop accepting new jobs. Already queued jobs can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
