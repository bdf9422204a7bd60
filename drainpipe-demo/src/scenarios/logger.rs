use std::time::Duration;

use drainpipe::error::DrainResult;
use drainpipe::pipeline::Pipeline;
use drainpipe::sink::writer::StdoutSink;
use drainpipe::types::{Record, Severity};
use drainpipe::workers::producer::ProducerPool;
use drainpipe_config::shared::{PipelineConfig, ShutdownProtocol};
use tokio::time::sleep;
use tracing::info;

/// Logs a start and a shutdown record `gap` apart, then stops the pipeline with
/// `protocol`.
pub async fn run(
    config: &PipelineConfig,
    protocol: ShutdownProtocol,
    gap: Duration,
) -> DrainResult<()> {
    match protocol {
        ShutdownProtocol::DelayClose => println!("Logger with delayed close:"),
        ShutdownProtocol::DoneSignal => println!("Logger with done signal:"),
    }

    let mut config = config.clone();
    config.shutdown.protocol = protocol;

    let mut pipeline = Pipeline::new(config, StdoutSink::stdout())?;
    pipeline.start().await?;

    let mut producers = ProducerPool::new();
    let sender = pipeline.sender();
    producers.spawn(async move {
        sender
            .enqueue(Record::new(Severity::Info, "App is starting"))
            .await?;
        sleep(gap).await;
        sender
            .enqueue(Record::new(Severity::Info, "App is shutting down"))
            .await
    });
    producers.wait_all().await?;

    let report = pipeline.shutdown_and_wait().await?;
    info!(
        drained = report.drained,
        abandoned = report.abandoned,
        "logger scenario finished"
    );

    Ok(())
}
