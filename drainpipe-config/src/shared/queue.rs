use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Configuration of the bounded queue between producers and the drainer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct QueueConfig {
    /// Maximum number of records buffered before producers are suspended.
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

impl QueueConfig {
    /// Default number of records the queue can buffer.
    pub const DEFAULT_CAPACITY: usize = 50;

    /// Largest accepted capacity, the permit limit of tokio's semaphore.
    pub const MAX_CAPACITY: usize = usize::MAX >> 3;

    /// Ensures the capacity is within `1..=MAX_CAPACITY`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.capacity == 0 {
            return Err(ValidationError::QueueCapacityZero);
        }

        if self.capacity > Self::MAX_CAPACITY {
            return Err(ValidationError::QueueCapacityTooLarge {
                capacity: self.capacity,
                max: Self::MAX_CAPACITY,
            });
        }

        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    QueueConfig::DEFAULT_CAPACITY
}
