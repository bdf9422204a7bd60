//! Concurrency primitives used to build and coordinate the drain pipeline.
//!
//! # Components
//!
//! - [`queue`]: the bounded FIFO queue between producers and the drainer.
//! - [`barrier`]: a reusable countdown rendezvous for groups of tasks.
//! - [`counter`]: an integer behind a reader/writer lock.
//! - [`shutdown`]: the done signal and the coordinator issuing the two termination
//!   protocols (delay-close and done-signal).
//!
//! All suspension points are cooperative: waiting producers, consumers, and
//! coordinators park on tokio synchronization primitives and never busy-poll.

pub mod barrier;
pub mod counter;
pub mod queue;
pub mod shutdown;
