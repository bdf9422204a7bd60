use std::future::Future;

use crate::error::DrainResult;

/// Trait for background workers of a pipeline.
///
/// [`Worker`] defines how a worker is started. Starting returns immediately with a handle
/// that can be used to observe progress and wait for completion.
///
/// The generic parameter `H` is the handle type returned on start, and `S` the state
/// type exposed through that handle.
pub trait Worker<H, S>
where
    H: WorkerHandle<S>,
{
    /// Error type returned when worker startup fails.
    type Error;

    /// Starts the worker and returns a handle for monitoring its execution.
    fn start(self) -> impl Future<Output = Result<H, Self::Error>> + Send;
}

/// Handle for monitoring a running worker.
///
/// The state returned by [`WorkerHandle::state`] is a live view that stays valid after
/// the worker completes, so it can be captured before [`WorkerHandle::wait`] consumes
/// the handle.
pub trait WorkerHandle<S> {
    /// Returns the current state of the worker.
    fn state(&self) -> S;

    /// Waits for the worker to complete and returns its final result.
    fn wait(self) -> impl Future<Output = DrainResult<()>> + Send;
}
