//! Counting rendezvous for a group of concurrently started tasks.
//!
//! A [`JoinBarrier`] keeps a pending count. Coordinators raise it with
//! [`JoinBarrier::add`] before starting work, every unit of work lowers it once with
//! [`JoinBarrier::done`], and [`JoinBarrier::wait`] suspends until it reaches zero.
//!
//! The count lives in a watch channel so that any number of waiters observe the zero
//! transition without polling. The barrier is reusable: once the count is back at zero a
//! new `add`/`wait` cycle can start on the same instance.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::error;

/// Counting rendezvous primitive.
///
/// Cloning yields another handle to the same pending count.
#[derive(Debug, Clone)]
pub struct JoinBarrier {
    pending: Arc<watch::Sender<usize>>,
}

impl JoinBarrier {
    /// Creates a barrier with a pending count of zero.
    pub fn new() -> Self {
        let (pending, _) = watch::channel(0);

        Self {
            pending: Arc::new(pending),
        }
    }

    /// Increases the pending count by `count`.
    ///
    /// Must be called before the corresponding units of work are started, so that the
    /// increase happens before any of their [`JoinBarrier::done`] calls.
    pub fn add(&self, count: usize) {
        if count == 0 {
            return;
        }

        self.pending.send_modify(|pending| *pending += count);
    }

    /// Decreases the pending count by one, waking waiters when it reaches zero.
    ///
    /// # Panics
    ///
    /// Panics if called more times than the matching [`JoinBarrier::add`] calls allow.
    /// The count is left untouched in that case.
    pub fn done(&self) {
        let mut underflow = false;
        self.pending.send_if_modified(|pending| match pending.checked_sub(1) {
            Some(remaining) => {
                *pending = remaining;
                true
            }
            None => {
                underflow = true;
                false
            }
        });

        if underflow {
            error!("join barrier done called without a matching add");
            panic!("join barrier misuse: done called more times than add");
        }
    }

    /// Suspends until the pending count is zero.
    ///
    /// Returns immediately when nothing is pending.
    pub async fn wait(&self) {
        let mut pending = self.pending.subscribe();
        // The sender is owned by this barrier, so the channel outlives the wait and
        // `wait_for` can only return once the predicate holds.
        let _ = pending.wait_for(|pending| *pending == 0).await;
    }

    /// Returns the current pending count.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Adds one to the pending count and returns a guard that calls
    /// [`JoinBarrier::done`] when dropped.
    ///
    /// The guard guarantees exactly one `done` per unit of work, including when the
    /// work panics or is cancelled.
    pub fn enter(&self) -> BarrierGuard {
        self.add(1);

        BarrierGuard {
            barrier: self.clone(),
        }
    }

    /// Spawns `future` on the runtime as one unit of work tracked by this barrier.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let guard = self.enter();

        tokio::spawn(async move {
            let _guard = guard;
            future.await
        })
    }
}

impl Default for JoinBarrier {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard returned by [`JoinBarrier::enter`].
#[derive(Debug)]
#[must_use = "dropping the guard immediately marks the unit of work as done"]
pub struct BarrierGuard {
    barrier: JoinBarrier,
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        self.barrier.done();
    }
}
