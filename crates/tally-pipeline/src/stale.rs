// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decides what happens to a tracked view whose message is missing at startup.

use std::io::{BufRead, Write};
use std::time::Duration;

use async_trait::async_trait;
use tally_core::ActiveView;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

#[async_trait]
pub trait StaleViewPolicy: Send + Sync {
    /// Return `true` to delete the view's record.
    async fn should_remove(&self, view: &ActiveView) -> bool;
}

/// Removes every missing view without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRemove;

#[async_trait]
impl StaleViewPolicy for AlwaysRemove {
    async fn should_remove(&self, _view: &ActiveView) -> bool {
        true
    }
}

/// Asks the operator on the console, defaulting to removal after a timeout.
///
/// Only an explicit `n` keeps the record.
pub struct ConsolePrompt {
    timeout: Duration,
    lines: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl ConsolePrompt {
    /// Read answers from stdin on a detached thread.
    ///
    /// The thread is not joined: it may stay blocked on a read after the last
    /// prompt and ends with the process.
    pub fn stdin(timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let spawned = std::thread::Builder::new()
            .name("tally-console".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to start console reader, prompts will time out");
        }
        Self::with_lines(rx, timeout)
    }

    /// Read answers from an arbitrary line source.
    pub fn with_lines(lines: mpsc::UnboundedReceiver<String>, timeout: Duration) -> Self {
        Self {
            timeout,
            lines: Mutex::new(lines),
        }
    }
}

#[async_trait]
impl StaleViewPolicy for ConsolePrompt {
    async fn should_remove(&self, view: &ActiveView) -> bool {
        let mut lines = self.lines.lock().await;
        // Answers typed after an earlier prompt timed out belong to no prompt.
        while lines.try_recv().is_ok() {}
        {
            let mut stderr = std::io::stderr().lock();
            let _ = write!(
                stderr,
                "View {} for group '{}' is missing. Remove its record? (Y/n, default Y in {}s): ",
                view.message_id,
                view.group_name,
                self.timeout.as_secs()
            );
            let _ = stderr.flush();
        }

        match tokio::time::timeout(self.timeout, lines.recv()).await {
            Ok(Some(answer)) => {
                let keep = answer.trim().eq_ignore_ascii_case("n");
                if keep {
                    info!(message_id = view.message_id, "operator chose to keep view record");
                }
                !keep
            }
            Ok(None) => true,
            Err(_) => {
                eprintln!();
                info!(message_id = view.message_id, "no answer, removing view record");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ActiveView {
        ActiveView {
            message_id: 9,
            channel_id: 8,
            guild_id: 1,
            group_name: "fruit".into(),
        }
    }

    #[tokio::test]
    async fn always_remove_removes() {
        assert!(AlwaysRemove.should_remove(&view()).await);
    }

    /// Sends `answer` once the prompt is waiting.
    fn answer_later(tx: &mpsc::UnboundedSender<String>, answer: &str) {
        let tx = tx.clone();
        let answer = answer.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let _ = tx.send(answer);
        });
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_no_keeps_record() {
        let (tx, rx) = mpsc::unbounded_channel();
        let prompt = ConsolePrompt::with_lines(rx, Duration::from_secs(5));
        answer_later(&tx, " N ");
        assert!(!prompt.should_remove(&view()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn any_other_answer_removes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let prompt = ConsolePrompt::with_lines(rx, Duration::from_secs(5));
        answer_later(&tx, "y");
        assert!(prompt.should_remove(&view()).await);
        answer_later(&tx, "");
        assert!(prompt.should_remove(&view()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_defaults_to_removal() {
        let (_tx, rx) = mpsc::unbounded_channel::<String>();
        let prompt = ConsolePrompt::with_lines(rx, Duration::from_secs(3));
        assert!(prompt.should_remove(&view()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn answer_typed_before_the_prompt_is_discarded() {
        let (tx, rx) = mpsc::unbounded_channel();
        let prompt = ConsolePrompt::with_lines(rx, Duration::from_secs(3));
        // Typed after an earlier prompt had already timed out.
        tx.send("n".to_string()).unwrap();
        assert!(prompt.should_remove(&view()).await);

        answer_later(&tx, "n");
        assert!(!prompt.should_remove(&view()).await);
    }
}
