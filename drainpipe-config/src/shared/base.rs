use thiserror::Error;

/// Errors raised while validating configuration values.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The queue must be able to buffer at least one record.
    #[error("`queue.capacity` cannot be zero")]
    QueueCapacityZero,
    /// The queue capacity exceeds what the slot semaphore can track.
    #[error("`queue.capacity` cannot exceed {max}, got {capacity}")]
    QueueCapacityTooLarge { capacity: usize, max: usize },
    /// A configured runtime needs at least one worker thread.
    #[error("`worker_threads` cannot be zero")]
    WorkerThreadsZero,
}
