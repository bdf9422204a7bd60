use serde::{Deserialize, Serialize};

use crate::shared::{QueueConfig, ShutdownConfig, ValidationError};

/// Configuration for a drain pipeline.
///
/// Every field is read once when the pipeline is built; nothing is reloaded at runtime.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Bounded queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Shutdown protocol settings.
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl PipelineConfig {
    /// Validates pipeline configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.queue.validate()
    }
}

/// Complete configuration of the demo binary.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DemoConfig {
    /// Configuration shared by every pipeline the demo builds.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Number of runtime worker threads. Defaults to the available parallelism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,
}

impl DemoConfig {
    /// Validates the complete demo configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.worker_threads == Some(0) {
            return Err(ValidationError::WorkerThreadsZero);
        }

        self.pipeline.validate()
    }
}
