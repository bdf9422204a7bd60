use std::future::Future;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error};

use crate::drain_error;
use crate::error::{DrainResult, ErrorKind};

/// Set of producer tasks feeding a pipeline.
///
/// Producers are spawned into a [`JoinSet`] so their failures can be collected once the
/// ingestion phase is over. [`ProducerPool::wait_all`] must complete before the shutdown
/// protocol is started, otherwise late enqueues race against the close.
#[derive(Debug, Default)]
pub struct ProducerPool {
    join_set: JoinSet<DrainResult<()>>,
}

impl ProducerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns one producer task.
    pub fn spawn<F>(&mut self, producer: F)
    where
        F: Future<Output = DrainResult<()>> + Send + 'static,
    {
        let id = self.join_set.len();
        let producer_span = tracing::debug_span!("producer", id);

        self.join_set.spawn(producer.instrument(producer_span.or_current()));
    }

    /// Returns the number of producers that have not been awaited yet.
    pub fn len(&self) -> usize {
        self.join_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.join_set.is_empty()
    }

    /// Waits for every producer and returns their errors, aggregated.
    ///
    /// A panicking producer is reported as [`ErrorKind::ProducerPanic`]. Cancelled
    /// producers are ignored.
    pub async fn wait_all(&mut self) -> DrainResult<()> {
        let mut errors = Vec::new();

        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(error = %err, "producer completed with error");
                    errors.push(err);
                }
                Err(join_err) => {
                    if join_err.is_cancelled() {
                        debug!("producer task was cancelled");
                    } else {
                        errors.push(drain_error!(
                            ErrorKind::ProducerPanic,
                            "Producer panicked",
                            join_err
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}
