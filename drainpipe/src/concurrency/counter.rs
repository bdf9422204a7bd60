use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared integer protected by a reader/writer lock.
///
/// Any number of readers may hold the lock at once, a writer holds it exclusively. The
/// value is only reachable inside the closures passed to [`GuardedCounter::read_locked`]
/// and [`GuardedCounter::write_locked`], and the lock guard is released on every exit
/// path of those closures, panics included. Tokio's lock is fair (FIFO), but callers must
/// not rely on any particular interleaving between contending readers and writers.
#[derive(Debug, Clone, Default)]
pub struct GuardedCounter {
    value: Arc<RwLock<i64>>,
}

impl GuardedCounter {
    pub fn new(initial: i64) -> Self {
        Self {
            value: Arc::new(RwLock::new(initial)),
        }
    }

    /// Runs `read` with shared access to the value.
    pub async fn read_locked<F, R>(&self, read: F) -> R
    where
        F: FnOnce(&i64) -> R,
    {
        let guard = self.value.read().await;
        read(&guard)
    }

    /// Runs `write` with exclusive access to the value.
    pub async fn write_locked<F, R>(&self, write: F) -> R
    where
        F: FnOnce(&mut i64) -> R,
    {
        let mut guard = self.value.write().await;
        write(&mut guard)
    }

    /// Returns a consistent snapshot of the value.
    pub async fn get(&self) -> i64 {
        self.read_locked(|value| *value).await
    }

    /// Increments the value by one and returns the new value.
    pub async fn increment(&self) -> i64 {
        self.write_locked(|value| {
            *value += 1;
            *value
        })
        .await
    }
}
