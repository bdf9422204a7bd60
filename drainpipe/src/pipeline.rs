use drainpipe_config::shared::{PipelineConfig, ShutdownProtocol};
use tracing::{error, info, warn};

use crate::bail;
use crate::concurrency::queue::{BoundedQueue, QueueSender};
use crate::concurrency::shutdown::{ShutdownCoordinator, ShutdownTx, create_shutdown_channel};
use crate::drain_error;
use crate::error::{DrainResult, ErrorKind};
use crate::sink::Sink;
use crate::types::{Record, Severity};
use crate::workers::base::{Worker, WorkerHandle};
use crate::workers::drainer::{DrainMode, Drainer, DrainerHandle};

#[derive(Debug)]
enum PipelineState {
    NotStarted,
    Started { drainer: DrainerHandle },
}

/// Summary of a pipeline run, returned once the drainer has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Protocol used to stop the pipeline.
    pub protocol: ShutdownProtocol,
    /// Records written to the sink.
    pub drained: u64,
    /// Records still buffered when the drainer stopped.
    pub abandoned: usize,
    /// Whether the queue was closed at the end of the run.
    pub queue_closed: bool,
}

/// Ingestion-and-drain pipeline.
///
/// A [`Pipeline`] owns one [`BoundedQueue`] of records, the single drainer reading it, and
/// the done signal. Producers obtain send-only handles through [`Pipeline::sender`] and
/// may run on any task. Once every producer has finished, [`Pipeline::shutdown_and_wait`]
/// runs the configured shutdown protocol and waits for the drainer to stop.
#[derive(Debug)]
pub struct Pipeline<K> {
    config: PipelineConfig,
    queue: BoundedQueue<Record>,
    sink: K,
    state: PipelineState,
    shutdown_tx: ShutdownTx,
}

impl<K> Pipeline<K>
where
    K: Sink + Clone + Send + Sync + 'static,
{
    /// Creates a pipeline writing to `sink`.
    ///
    /// Fails with [`ErrorKind::ConfigError`] if the configuration is invalid.
    pub fn new(config: PipelineConfig, sink: K) -> DrainResult<Self> {
        if let Err(err) = config.validate() {
            return Err(drain_error!(
                ErrorKind::ConfigError,
                "Invalid pipeline configuration",
                err,
                source: err
            ));
        }

        // The receiver is not kept here, drainers subscribe through the sender instead.
        let (shutdown_tx, _) = create_shutdown_channel();

        Ok(Self {
            queue: BoundedQueue::new(config.queue.capacity),
            config,
            sink,
            state: PipelineState::NotStarted,
            shutdown_tx,
        })
    }

    /// Returns a send-only handle producers use to enqueue records.
    pub fn sender(&self) -> QueueSender<Record> {
        self.queue.sender()
    }

    /// Builds a record stamped now and enqueues it.
    pub async fn log(&self, severity: Severity, message: impl Into<String>) -> DrainResult<()> {
        self.queue.enqueue(Record::new(severity, message)).await
    }

    /// Starts the drainer.
    ///
    /// The drain mode follows the configured shutdown protocol: delay-close pipelines drain
    /// until the queue is closed, done-signal pipelines stop on the done signal.
    pub async fn start(&mut self) -> DrainResult<()> {
        if let PipelineState::Started { .. } = self.state {
            bail!(
                ErrorKind::InvalidState,
                "Pipeline already started",
                "a pipeline has exactly one drainer"
            );
        }

        let protocol = self.config.shutdown.protocol;
        info!(
            capacity = self.config.queue.capacity,
            ?protocol,
            grace_delay_ms = self.config.shutdown.grace_delay_ms,
            "starting pipeline"
        );

        let drainer = Drainer::new(
            self.queue.clone(),
            self.sink.clone(),
            DrainMode::from(protocol),
            self.shutdown_tx.subscribe(),
        )
        .start()
        .await?;

        self.state = PipelineState::Started { drainer };

        Ok(())
    }

    /// Waits for the drainer to stop and reports the outcome.
    ///
    /// Without a prior shutdown this only returns once the drainer stops on its own, so
    /// callers normally use [`Pipeline::shutdown_and_wait`].
    pub async fn wait(self) -> DrainResult<DrainReport> {
        let protocol = self.config.shutdown.protocol;

        let PipelineState::Started { drainer } = self.state else {
            info!("pipeline was not started, nothing to wait for");

            return Ok(DrainReport {
                protocol,
                drained: 0,
                abandoned: self.queue.len(),
                queue_closed: self.queue.is_closed(),
            });
        };

        info!("waiting for drainer to complete");

        let state = drainer.state();
        if let Err(err) = drainer.wait().await {
            error!(drained = state.drained(), "drainer completed with an error");
            return Err(err);
        }

        let report = DrainReport {
            protocol,
            drained: state.drained(),
            abandoned: self.queue.len(),
            queue_closed: self.queue.is_closed(),
        };

        if report.abandoned > 0 {
            warn!(
                abandoned = report.abandoned,
                "drainer stopped with records still buffered"
            );
        }

        info!(drained = report.drained, "pipeline stopped");

        Ok(report)
    }

    /// Runs the configured shutdown protocol, then waits for the drainer to stop.
    ///
    /// Callers must make sure every producer has finished enqueueing before calling this.
    /// With the delay-close protocol, enqueues attempted after the grace delay fail with
    /// [`ErrorKind::QueueClosed`].
    pub async fn shutdown_and_wait(self) -> DrainResult<DrainReport> {
        info!("trying to shut down the pipeline");

        let grace_delay = self.config.shutdown.grace_delay();
        ShutdownCoordinator::new(
            self.queue.clone(),
            self.shutdown_tx.clone(),
            self.config.shutdown.protocol,
            grace_delay,
        )
        .shutdown()
        .await;

        self.wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::memory::MemorySink;
    use crate::test_utils::sink::{FailingSink, TestSinkWrapper};
    use drainpipe_config::shared::{QueueConfig, ShutdownConfig};
    use std::time::Duration;
    use tokio::time::timeout;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    fn config(protocol: ShutdownProtocol, capacity: usize) -> PipelineConfig {
        PipelineConfig {
            queue: QueueConfig { capacity },
            shutdown: ShutdownConfig {
                protocol,
                grace_delay_ms: 10,
            },
        }
    }

    #[test]
    fn zero_capacity_is_a_config_error() {
        let err = Pipeline::new(config(ShutdownProtocol::DelayClose, 0), MemorySink::new())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn over_limit_capacity_is_a_config_error() {
        let err = Pipeline::new(
            config(ShutdownProtocol::DelayClose, usize::MAX / 2),
            MemorySink::new(),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigError);
        assert!(err.detail().unwrap().contains("cannot exceed"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn starting_twice_is_rejected() {
        let mut pipeline =
            Pipeline::new(config(ShutdownProtocol::DelayClose, 4), MemorySink::new()).unwrap();

        pipeline.start().await.unwrap();
        let err = pipeline.start().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let report = timeout(TEST_TIMEOUT, pipeline.shutdown_and_wait())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.drained, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn waiting_on_unstarted_pipeline_reports_buffered_records() {
        let pipeline =
            Pipeline::new(config(ShutdownProtocol::DelayClose, 4), MemorySink::new()).unwrap();
        pipeline.log(Severity::Info, "buffered").await.unwrap();

        let report = pipeline.wait().await.unwrap();

        assert_eq!(report.drained, 0);
        assert_eq!(report.abandoned, 1);
        assert!(!report.queue_closed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delay_close_drains_and_flushes() {
        let sink = TestSinkWrapper::wrap(MemorySink::new());
        let mut pipeline = Pipeline::new(config(ShutdownProtocol::DelayClose, 2), sink.clone())
            .unwrap();
        pipeline.start().await.unwrap();

        for i in 0..10 {
            pipeline
                .log(Severity::Warning, format!("record {i}"))
                .await
                .unwrap();
        }
        sink.wait_for_records(10).await.notified().await;

        let report = timeout(TEST_TIMEOUT, pipeline.shutdown_and_wait())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.drained, 10);
        assert_eq!(report.abandoned, 0);
        assert!(report.queue_closed);
        assert!(sink.flush_called().await);

        let messages: Vec<String> = sink
            .records()
            .await
            .iter()
            .map(|record| record.message().to_owned())
            .collect();
        let expected: Vec<String> = (0..10).map(|i| format!("record {i}")).collect();
        assert_eq!(messages, expected);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sink_failure_is_reported_by_wait() {
        let sink = FailingSink::new(1);
        let mut pipeline =
            Pipeline::new(config(ShutdownProtocol::DelayClose, 4), sink.clone()).unwrap();
        pipeline.start().await.unwrap();

        pipeline.log(Severity::Info, "accepted").await.unwrap();
        pipeline.log(Severity::Error, "refused").await.unwrap();

        let err = timeout(TEST_TIMEOUT, pipeline.shutdown_and_wait())
            .await
            .unwrap()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SinkIoError);
        assert_eq!(sink.written(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn done_signal_stops_the_drainer_with_the_queue_open() {
        let sink = MemorySink::new();
        let mut pipeline =
            Pipeline::new(config(ShutdownProtocol::DoneSignal, 4), sink.clone()).unwrap();
        pipeline.start().await.unwrap();

        let report = timeout(TEST_TIMEOUT, pipeline.shutdown_and_wait())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.protocol, ShutdownProtocol::DoneSignal);
        assert!(!report.queue_closed);
        assert_eq!(report.drained, 0);
    }
}
