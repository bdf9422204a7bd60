//! Fixed-capacity FIFO queue connecting many producers to a single consumer.
//!
//! [`BoundedQueue`] is the canonical bounded buffer: producers suspend while the queue is
//! full, the consumer suspends while it is empty, and a one-shot close turns the empty
//! state into a terminal "closed and drained" sentinel.
//!
//! Free slots are tracked with a [`Semaphore`] holding one permit per slot. Closing the
//! queue closes the semaphore, which fails every producer currently waiting for a slot
//! with [`ErrorKind::QueueClosed`] instead of leaving it blocked forever.

use drainpipe_config::shared::QueueConfig;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, Semaphore};
use tracing::debug;

use crate::bail;
use crate::error::{DrainResult, ErrorKind};

/// Default capacity used when no explicit capacity is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = QueueConfig::DEFAULT_CAPACITY;

#[derive(Debug)]
struct Buffer<T> {
    items: VecDeque<T>,
    closed: bool,
}

#[derive(Debug)]
struct Shared<T> {
    /// Buffered items and the closed flag. Never held across an await point.
    buffer: Mutex<Buffer<T>>,
    /// One permit per free slot.
    slots: Semaphore,
    /// Woken whenever an item is pushed or the queue is closed.
    not_empty: Notify,
    capacity: usize,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Buffer<T>> {
        // Critical sections never panic, so a poisoned lock still holds a consistent buffer.
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enqueue(&self, item: T) -> DrainResult<()> {
        let Ok(permit) = self.slots.acquire().await else {
            bail!(
                ErrorKind::QueueClosed,
                "Queue is closed",
                "the queue was closed while waiting for a free slot"
            );
        };

        let mut buffer = self.lock();
        if buffer.closed {
            // The permit goes back to the semaphore on drop, keeping the slot count intact.
            bail!(
                ErrorKind::QueueClosed,
                "Queue is closed",
                "no further records are accepted after close"
            );
        }

        buffer.items.push_back(item);
        // The slot now belongs to the buffered item and is returned by the dequeue that pops it.
        permit.forget();
        drop(buffer);

        self.not_empty.notify_one();

        Ok(())
    }
}

/// A bounded, concurrency-safe FIFO queue.
///
/// Cloning a [`BoundedQueue`] yields another handle to the same queue. Producers that
/// should only be able to insert can be given a [`QueueSender`] via
/// [`BoundedQueue::sender`].
///
/// Ordering is global: items are dequeued in the exact order their enqueue operations
/// completed, across all producers.
pub struct BoundedQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty, open queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or larger than [`Semaphore::MAX_PERMITS`].
    /// [`QueueConfig::validate`] rejects both, so configured capacities never panic here.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "bounded queue capacity must be greater than zero");
        assert!(
            capacity <= Semaphore::MAX_PERMITS,
            "bounded queue capacity exceeds the semaphore permit limit"
        );

        let shared = Shared {
            buffer: Mutex::new(Buffer {
                // Grows on demand, the semaphore enforces the bound.
                items: VecDeque::new(),
                closed: false,
            }),
            slots: Semaphore::new(capacity),
            not_empty: Notify::new(),
            capacity,
        };

        Self {
            shared: Arc::new(shared),
        }
    }

    /// Inserts `item` at the tail of the queue.
    ///
    /// Suspends while the queue is full. Returns an [`ErrorKind::QueueClosed`] error if
    /// the queue is closed, either before the call or while the call is waiting for space.
    pub async fn enqueue(&self, item: T) -> DrainResult<()> {
        self.shared.enqueue(item).await
    }

    /// Removes the item at the head of the queue.
    ///
    /// Suspends until an item is available. Returns `None` once the queue is closed and
    /// every buffered item has been dequeued, and keeps returning `None` afterwards.
    ///
    /// This method is cancel-safe: if the returned future is dropped before completing,
    /// no item is removed from the queue. It can therefore be raced against other events
    /// inside `tokio::select!`.
    pub async fn dequeue(&self) -> Option<T> {
        loop {
            // Register interest before inspecting the buffer so that a push or close
            // happening in between is not missed.
            let notified = self.shared.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut buffer = self.shared.lock();
                if let Some(item) = buffer.items.pop_front() {
                    self.shared.slots.add_permits(1);
                    return Some(item);
                }

                if buffer.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Closes the queue.
    ///
    /// Items already buffered remain available to [`BoundedQueue::dequeue`]. Producers
    /// waiting for space are released with an error, and consumers waiting on an empty
    /// queue observe the closed state.
    ///
    /// # Panics
    ///
    /// Panics if the queue was already closed. A queue is closed exactly once.
    pub fn close(&self) {
        let (already_closed, remaining) = {
            let mut buffer = self.shared.lock();
            let already_closed = std::mem::replace(&mut buffer.closed, true);
            (already_closed, buffer.items.len())
        };

        if already_closed {
            panic!("bounded queue closed more than once");
        }

        self.shared.slots.close();
        self.shared.not_empty.notify_waiters();

        debug!(remaining, "queue closed");
    }

    /// Returns a send-only handle to this queue.
    pub fn sender(&self) -> QueueSender<T> {
        QueueSender {
            shared: self.shared.clone(),
        }
    }

    /// Returns the number of buffered items.
    pub fn len(&self) -> usize {
        self.shared.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buffer = self.shared.lock();
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.shared.capacity)
            .field("len", &buffer.items.len())
            .field("closed", &buffer.closed)
            .finish()
    }
}

/// Send-only handle to a [`BoundedQueue`].
///
/// Holders can insert items but can neither dequeue nor close the queue.
pub struct QueueSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> QueueSender<T> {
    /// Inserts `item` at the tail of the queue. See [`BoundedQueue::enqueue`].
    pub async fn enqueue(&self, item: T) -> DrainResult<()> {
        self.shared.enqueue(item).await
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for QueueSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueSender")
            .field("capacity", &self.shared.capacity)
            .finish_non_exhaustive()
    }
}
