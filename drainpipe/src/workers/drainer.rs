use drainpipe_config::shared::ShutdownProtocol;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info};

use crate::concurrency::queue::BoundedQueue;
use crate::concurrency::shutdown::ShutdownRx;
use crate::drain_error;
use crate::error::{DrainError, DrainResult, ErrorKind};
use crate::sink::Sink;
use crate::types::Record;
use crate::workers::base::{Worker, WorkerHandle};

/// How the drainer decides to stop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrainMode {
    /// Dequeue until the queue is closed and empty.
    ///
    /// Every record enqueued before the close is rendered exactly once, in order.
    Range,
    /// Wait on either the next record or the done signal, whichever comes first.
    ///
    /// The drainer stops as soon as it observes the done signal, without draining what is
    /// still buffered. When a record and the signal are ready at the same time the choice
    /// between them is unspecified, so records enqueued around the signal may be lost.
    /// A closed and drained queue also stops the drainer.
    Select,
}

impl From<ShutdownProtocol> for DrainMode {
    fn from(protocol: ShutdownProtocol) -> Self {
        match protocol {
            ShutdownProtocol::DelayClose => DrainMode::Range,
            ShutdownProtocol::DoneSignal => DrainMode::Select,
        }
    }
}

/// Live progress of a drainer.
#[derive(Debug, Clone, Default)]
pub struct DrainerState {
    drained: Arc<AtomicU64>,
}

impl DrainerState {
    /// Returns the number of records written to the sink so far.
    pub fn drained(&self) -> u64 {
        self.drained.load(Ordering::Acquire)
    }

    fn record_drained(&self) {
        self.drained.fetch_add(1, Ordering::AcqRel);
    }
}

/// Handle for monitoring the drainer task.
#[derive(Debug)]
pub struct DrainerHandle {
    state: DrainerState,
    handle: Option<JoinHandle<DrainResult<()>>>,
}

impl WorkerHandle<DrainerState> for DrainerHandle {
    fn state(&self) -> DrainerState {
        self.state.clone()
    }

    async fn wait(mut self) -> DrainResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        handle.await.map_err(|err| {
            if err.is_cancelled() {
                drain_error!(
                    ErrorKind::DrainerCancelled,
                    "Drainer task was cancelled",
                    err,
                    source: err
                )
            } else {
                drain_error!(
                    ErrorKind::DrainerPanic,
                    "Drainer task panicked",
                    err,
                    source: err
                )
            }
        })??;

        Ok(())
    }
}

/// The single consumer of a pipeline.
///
/// [`Drainer`] removes records from the queue one at a time and writes them to its
/// sink, so records reach the sink strictly in queue order. A render that has started is
/// always completed; stopping only prevents the next record from being taken.
#[derive(Debug)]
pub struct Drainer<K> {
    queue: BoundedQueue<Record>,
    sink: K,
    mode: DrainMode,
    shutdown_rx: ShutdownRx,
}

impl<K> Drainer<K> {
    pub fn new(
        queue: BoundedQueue<Record>,
        sink: K,
        mode: DrainMode,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            queue,
            sink,
            mode,
            shutdown_rx,
        }
    }
}

impl<K> Worker<DrainerHandle, DrainerState> for Drainer<K>
where
    K: Sink + Send + Sync + 'static,
{
    type Error = DrainError;

    async fn start(self) -> DrainResult<DrainerHandle> {
        info!(sink = K::name(), mode = ?self.mode, "starting drainer");

        let state = DrainerState::default();
        let drainer_span = tracing::info_span!("drainer", sink = K::name(), mode = ?self.mode);

        let Drainer {
            queue,
            sink,
            mode,
            mut shutdown_rx,
        } = self;
        let drainer_state = state.clone();

        let drainer = async move {
            match mode {
                DrainMode::Range => range_drain(&queue, &sink, &drainer_state).await?,
                DrainMode::Select => {
                    select_drain(&queue, &sink, &drainer_state, &mut shutdown_rx).await?
                }
            }

            sink.flush().await?;

            info!(
                drained = drainer_state.drained(),
                "drainer completed successfully"
            );

            Ok(())
        }
        .instrument(drainer_span.or_current());

        let handle = tokio::spawn(drainer);

        Ok(DrainerHandle {
            state,
            handle: Some(handle),
        })
    }
}

async fn range_drain<K: Sink>(
    queue: &BoundedQueue<Record>,
    sink: &K,
    state: &DrainerState,
) -> DrainResult<()> {
    while let Some(record) = queue.dequeue().await {
        render(sink, state, &record).await?;
    }

    info!("queue closed and drained, stopping");

    Ok(())
}

async fn select_drain<K: Sink>(
    queue: &BoundedQueue<Record>,
    sink: &K,
    state: &DrainerState,
    shutdown_rx: &mut ShutdownRx,
) -> DrainResult<()> {
    loop {
        tokio::select! {
            record = queue.dequeue() => {
                let Some(record) = record else {
                    info!("queue closed and drained, stopping");
                    return Ok(());
                };

                render(sink, state, &record).await?;
            }
            // A dropped coordinator counts as a done signal as well.
            _ = shutdown_rx.changed() => {
                info!(abandoned = queue.len(), "done signal received, stopping without draining");
                return Ok(());
            }
        }
    }
}

async fn render<K: Sink>(sink: &K, state: &DrainerState, record: &Record) -> DrainResult<()> {
    sink.write_record(record).await?;
    state.record_drained();

    debug!(severity = %record.severity(), "record drained");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::shutdown::create_shutdown_channel;
    use crate::sink::memory::MemorySink;
    use std::time::Duration;
    use tokio::time::timeout;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test(flavor = "multi_thread")]
    async fn range_mode_drains_everything_before_stopping() {
        let queue = BoundedQueue::new(8);
        let sink = MemorySink::new();
        let (shutdown_tx, _) = create_shutdown_channel();

        let handle = Drainer::new(
            queue.clone(),
            sink.clone(),
            DrainMode::Range,
            shutdown_tx.subscribe(),
        )
        .start()
        .await
        .unwrap();

        for message in ["one", "two", "three"] {
            queue.enqueue(Record::info(message)).await.unwrap();
        }
        // The done signal has no effect on a range drainer.
        let _ = shutdown_tx.shutdown();
        queue.close();

        let state = handle.state();
        timeout(TEST_TIMEOUT, handle.wait()).await.unwrap().unwrap();

        let messages: Vec<String> = sink
            .records()
            .await
            .iter()
            .map(|record| record.message().to_owned())
            .collect();
        assert_eq!(messages, vec!["one", "two", "three"]);
        assert_eq!(state.drained(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn select_mode_stops_on_done_signal() {
        let queue = BoundedQueue::new(8);
        let sink = MemorySink::new();
        let (shutdown_tx, _) = create_shutdown_channel();

        let handle = Drainer::new(
            queue.clone(),
            sink.clone(),
            DrainMode::Select,
            shutdown_tx.subscribe(),
        )
        .start()
        .await
        .unwrap();

        shutdown_tx.shutdown().unwrap();
        timeout(TEST_TIMEOUT, handle.wait()).await.unwrap().unwrap();

        // Records arriving after the drainer stopped stay in the queue.
        queue.enqueue(Record::info("late")).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert!(sink.records().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn select_mode_stops_when_queue_is_closed() {
        let queue = BoundedQueue::new(8);
        let sink = MemorySink::new();
        let (shutdown_tx, _) = create_shutdown_channel();

        let handle = Drainer::new(
            queue.clone(),
            sink.clone(),
            DrainMode::Select,
            shutdown_tx.subscribe(),
        )
        .start()
        .await
        .unwrap();

        queue.enqueue(Record::warning("only")).await.unwrap();
        queue.close();

        timeout(TEST_TIMEOUT, handle.wait()).await.unwrap().unwrap();
        assert_eq!(sink.records().await.len(), 1);
    }

    #[test]
    fn protocols_map_to_modes() {
        assert_eq!(DrainMode::from(ShutdownProtocol::DelayClose), DrainMode::Range);
        assert_eq!(DrainMode::from(ShutdownProtocol::DoneSignal), DrainMode::Select);
    }

    async fn stuck_drainer() -> DrainResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn panicking_drainer() -> DrainResult<()> {
        panic!("drainer blew up");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelled_drainer_is_not_reported_as_panic() {
        let join_handle = tokio::spawn(stuck_drainer());
        join_handle.abort();
        let handle = DrainerHandle {
            state: DrainerState::default(),
            handle: Some(join_handle),
        };

        let err = timeout(TEST_TIMEOUT, handle.wait()).await.unwrap().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DrainerCancelled);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn panicking_drainer_is_reported_as_panic() {
        let handle = DrainerHandle {
            state: DrainerState::default(),
            handle: Some(tokio::spawn(panicking_drainer())),
        };

        let err = timeout(TEST_TIMEOUT, handle.wait()).await.unwrap().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DrainerPanic);
    }
}
