//! Demo scenarios built on the pipeline and its primitives.

use std::time::Duration;

use drainpipe::error::DrainResult;
use drainpipe_config::shared::{PipelineConfig, ShutdownProtocol};

use crate::cli::Scenario;

mod channels;
mod logger;
mod primitives;

/// Number of reader/writer pairs in the counter scenario.
const COUNTER_PAIRS: usize = 10;

/// Runs `scenario` to completion.
pub async fn run(scenario: Scenario, config: &PipelineConfig, gap: Duration) -> DrainResult<()> {
    match scenario {
        Scenario::All => {
            logger::run(config, ShutdownProtocol::DelayClose, gap).await?;
            logger::run(config, ShutdownProtocol::DoneSignal, gap).await?;
            primitives::wait_group().await;
            primitives::counter(COUNTER_PAIRS).await;
            channels::run(config.queue.capacity).await
        }
        Scenario::Logger => logger::run(config, ShutdownProtocol::DelayClose, gap).await,
        Scenario::SelectLogger => logger::run(config, ShutdownProtocol::DoneSignal, gap).await,
        Scenario::WaitGroup => {
            primitives::wait_group().await;
            Ok(())
        }
        Scenario::Counter => {
            primitives::counter(COUNTER_PAIRS).await;
            Ok(())
        }
        Scenario::Channels => channels::run(config.queue.capacity).await,
    }
}
