//! Shared configuration types for drain pipelines.

mod base;
mod pipeline;
mod queue;
mod shutdown;

pub use base::ValidationError;
pub use pipeline::{DemoConfig, PipelineConfig};
pub use queue::QueueConfig;
pub use shutdown::{ShutdownConfig, ShutdownProtocol};
