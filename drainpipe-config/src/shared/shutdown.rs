use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a pipeline is terminated once producers are finished.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownProtocol {
    /// Close the queue after the grace delay; every record enqueued before the close is
    /// drained.
    #[default]
    DelayClose,
    /// Send a done signal after the grace delay; the drainer stops without draining what
    /// is still buffered.
    DoneSignal,
}

/// Shutdown configuration for pipelines.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ShutdownConfig {
    /// Termination protocol.
    #[serde(default)]
    pub protocol: ShutdownProtocol,
    /// Time, in milliseconds, to wait after the last producer before terminating.
    #[serde(default = "default_grace_delay_ms")]
    pub grace_delay_ms: u64,
}

impl ShutdownConfig {
    /// Default grace delay in milliseconds.
    pub const DEFAULT_GRACE_DELAY_MS: u64 = 100;

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            protocol: ShutdownProtocol::default(),
            grace_delay_ms: default_grace_delay_ms(),
        }
    }
}

fn default_grace_delay_ms() -> u64 {
    ShutdownConfig::DEFAULT_GRACE_DELAY_MS
}
