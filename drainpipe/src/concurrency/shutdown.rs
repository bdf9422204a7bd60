//! Shutdown signalling and the two termination protocols of a pipeline.
//!
//! The done signal is a watch channel of unit values: sending on it notifies every
//! subscribed receiver at once, and carries no payload. [`ShutdownCoordinator`] decides
//! how a pipeline stops, either by closing its queue after a grace delay or by sending the
//! done signal after that delay.

use drainpipe_config::shared::ShutdownProtocol;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::concurrency::queue::BoundedQueue;

/// Receiver side of the done signal.
pub type ShutdownRx = watch::Receiver<()>;

/// Result of sending the done signal. Fails only when no receiver is left.
pub type ShutdownResult = Result<(), watch::error::SendError<()>>;

/// Transmitter side of the done signal.
#[derive(Debug, Clone)]
pub struct ShutdownTx(Arc<watch::Sender<()>>);

impl ShutdownTx {
    /// Wraps a watch sender into a [`ShutdownTx`].
    pub fn new(tx: watch::Sender<()>) -> Self {
        Self(Arc::new(tx))
    }

    /// Notifies every subscribed receiver that work must stop.
    pub fn shutdown(&self) -> ShutdownResult {
        self.0.send(())
    }

    /// Creates a new receiver that only observes signals sent after this call.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Creates a new done-signal channel.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx::new(tx), rx)
}

/// Issues the termination protocol of a pipeline.
///
/// The coordinator is consumed by [`ShutdownCoordinator::shutdown`], so a pipeline can be
/// terminated at most once.
#[derive(Debug)]
pub struct ShutdownCoordinator<T> {
    queue: BoundedQueue<T>,
    shutdown_tx: ShutdownTx,
    protocol: ShutdownProtocol,
    grace_delay: Duration,
}

impl<T> ShutdownCoordinator<T> {
    pub fn new(
        queue: BoundedQueue<T>,
        shutdown_tx: ShutdownTx,
        protocol: ShutdownProtocol,
        grace_delay: Duration,
    ) -> Self {
        Self {
            queue,
            shutdown_tx,
            protocol,
            grace_delay,
        }
    }

    /// Runs the configured protocol.
    ///
    /// Callers invoke this after their last producer has finished enqueueing.
    pub async fn shutdown(self) {
        match self.protocol {
            ShutdownProtocol::DelayClose => self.delay_close().await,
            ShutdownProtocol::DoneSignal => self.signal_done().await,
        }
    }

    /// Waits for the grace delay, then closes the queue.
    ///
    /// Records enqueued before the close are all drained. Enqueues attempted after it fail
    /// with a queue-closed error.
    pub async fn delay_close(self) {
        sleep(self.grace_delay).await;

        info!(
            grace_delay_ms = self.grace_delay.as_millis() as u64,
            pending = self.queue.len(),
            "grace delay elapsed, closing queue"
        );

        self.queue.close();
    }

    /// Waits for the grace delay, then sends the done signal.
    ///
    /// The queue stays open. A drainer multiplexing between the queue and the signal may
    /// stop before rendering records that are still buffered.
    pub async fn signal_done(self) {
        sleep(self.grace_delay).await;

        info!(
            grace_delay_ms = self.grace_delay.as_millis() as u64,
            pending = self.queue.len(),
            "grace delay elapsed, sending done signal"
        );

        if let Err(err) = self.shutdown_tx.shutdown() {
            warn!("no drainer is listening for the done signal: {err}");
        }
    }
}
