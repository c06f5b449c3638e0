// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Supervised background tasks.

use std::future::Future;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns the background tasks of one adapter.
///
/// Every task is spawned under a shared [`CancellationToken`]. Tasks may call
/// [`cancel`](Self::cancel) to bring their siblings down; only the owner
/// calls [`shutdown`](Self::shutdown), which also waits for them to exit.
#[derive(Debug, Default)]
pub struct TaskSupervisor {
    cancel: Mutex<CancellationToken>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskSupervisor {
    /// Creates a supervisor with no tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the token of the current task generation.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }

    /// Starts a new generation if the previous one was cancelled.
    pub fn reset(&self) {
        let mut cancel = self.cancel.lock();
        if cancel.is_cancelled() {
            *cancel = CancellationToken::new();
        }
    }

    /// Spawns `task`, dropping it as soon as the generation is cancelled.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => tracing::debug!(task = name, "Task cancelled"),
                () = task => tracing::debug!(task = name, "Task finished"),
            }
        });

        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Signals every task to stop without waiting.
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    /// Cancels every task and waits for all of them to exit.
    ///
    /// Safe to call repeatedly, and concurrently with a task cancelling
    /// itself. Must not be awaited from inside a supervised task.
    pub async fn shutdown(&self) {
        self.cancel();
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(error = %e, "Background task panicked");
                }
            }
        }
    }

    /// Returns the number of tasks still running.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.handles.lock().iter().filter(|h| !h.is_finished()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_cancels_pending_tasks() {
        let supervisor = TaskSupervisor::new();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        supervisor.spawn("sleeper", async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(supervisor.active_count(), 1);

        supervisor.shutdown().await;
        assert_eq!(supervisor.active_count(), 0);
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let supervisor = TaskSupervisor::new();
        supervisor.spawn("noop", async {});
        supervisor.shutdown().await;
        supervisor.shutdown().await;
        assert!(supervisor.token().is_cancelled());
    }

    #[tokio::test]
    async fn reset_starts_new_generation() {
        let supervisor = TaskSupervisor::new();
        supervisor.cancel();
        assert!(supervisor.token().is_cancelled());

        supervisor.reset();
        assert!(!supervisor.token().is_cancelled());
    }

    #[tokio::test]
    async fn task_can_cancel_siblings() {
        let supervisor = Arc::new(TaskSupervisor::new());
        supervisor.spawn("sibling", async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let owner = Arc::clone(&supervisor);
        supervisor.spawn("reader", async move {
            owner.cancel();
        });

        tokio::time::timeout(Duration::from_secs(5), supervisor.shutdown())
            .await
            .unwrap();
    }
}
