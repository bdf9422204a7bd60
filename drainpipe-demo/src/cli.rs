use std::time::Duration;

use clap::{Parser, Subcommand};

/// Runs the concurrent ingestion-and-drain demo scenarios.
#[derive(Parser, Debug)]
#[command(name = "drainpipe-demo")]
#[command(about = "Runs the concurrent ingestion-and-drain demo scenarios")]
pub struct Args {
    /// Scenario to run. Runs every scenario when omitted.
    #[command(subcommand)]
    scenario: Option<Scenario>,

    /// Pause between the first and last record of the logger scenarios, in milliseconds
    #[arg(long, default_value_t = 2000, global = true)]
    pub gap_ms: u64,
}

impl Args {
    pub fn scenario(&self) -> Scenario {
        self.scenario.unwrap_or_default()
    }

    pub fn gap(&self) -> Duration {
        Duration::from_millis(self.gap_ms)
    }
}

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scenario {
    /// Every scenario below, in order
    #[default]
    All,
    /// Pipeline stopped by closing the queue after the grace delay
    Logger,
    /// Pipeline stopped by a done signal; buffered records may be lost
    SelectLogger,
    /// Two tasks joined by a barrier
    WaitGroup,
    /// Readers and writers sharing a lock-guarded counter
    Counter,
    /// Producer and consumer hand-offs over bounded queues
    Channels,
}
