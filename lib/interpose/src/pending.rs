//! Pending-task registry.
//!
//! Counts in-flight requests so callers can wait for the point where no
//! request is outstanding. Each tracked request holds a [`PendingTask`]
//! guard; the task is released when the guard is handed back through
//! [`PendingTasks::remove`] or dropped, whichever comes first, and never twice.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::trace;

/// Shared registry of pending tasks.
///
/// Cheap to clone; clones observe the same set of tasks.
#[derive(Debug, Clone)]
pub struct PendingTasks {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    next_id: AtomicU64,
    tasks: Mutex<BTreeSet<u64>>,
    count: watch::Sender<usize>,
}

impl Default for PendingTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingTasks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(0),
                tasks: Mutex::new(BTreeSet::new()),
                count,
            }),
        }
    }

    /// Registers a new pending task.
    #[must_use = "the task is released as soon as the guard is dropped"]
    pub fn add(&self) -> PendingTask {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut tasks = self.lock();
            tasks.insert(id);
            tasks.len()
        };
        self.inner.count.send_replace(count);
        trace!(task = id, pending = count, "pending task added");

        PendingTask {
            id,
            registry: self.clone(),
        }
    }

    /// Releases `task`.
    pub fn remove(&self, task: PendingTask) {
        drop(task);
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no task is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns `true` if at least one task is pending.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.is_empty()
    }

    /// Completes once no task is pending.
    ///
    /// Returns immediately when the registry is already empty.
    pub async fn when_stable(&self) {
        let mut count = self.inner.count.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = count.wait_for(|pending| *pending == 0).await;
    }

    fn release(&self, id: u64) {
        let count = {
            let mut tasks = self.lock();
            if !tasks.remove(&id) {
                return;
            }
            tasks.len()
        };
        self.inner.count.send_replace(count);
        trace!(task = id, pending = count, "pending task removed");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<u64>> {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Guard for one pending task; releases it on drop.
#[derive(Debug)]
pub struct PendingTask {
    id: u64,
    registry: PendingTasks,
}

impl PendingTask {
    /// Identifier of the task within its registry.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for PendingTask {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert2::check;

    use super::*;

    #[test]
    fn add_and_remove() {
        let pending = PendingTasks::new();
        check!(!pending.has_pending());

        let first = pending.add();
        let second = pending.add();
        check!(first.id() != second.id());
        check!(pending.len() == 2);

        pending.remove(first);
        check!(pending.len() == 1);

        drop(second);
        check!(pending.is_empty());
    }

    #[test]
    fn clones_share_state() {
        let pending = PendingTasks::new();
        let clone = pending.clone();

        let task = clone.add();
        check!(pending.has_pending());
        pending.remove(task);
        check!(!clone.has_pending());
    }

    #[tokio::test]
    async fn when_stable_returns_immediately_when_empty() {
        let pending = PendingTasks::new();
        tokio::time::timeout(Duration::from_millis(50), pending.when_stable())
            .await
            .expect("already stable");
    }

    #[tokio::test]
    async fn when_stable_waits_for_last_task() {
        let pending = PendingTasks::new();
        let first = pending.add();
        let second = pending.add();

        let waiter = {
            let pending = pending.clone();
            tokio::spawn(async move { pending.when_stable().await })
        };

        drop(first);
        tokio::task::yield_now().await;
        check!(!waiter.is_finished());

        drop(second);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("stable in time")
            .expect("waiter task");
    }
}
