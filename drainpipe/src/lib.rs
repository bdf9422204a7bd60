//! Concurrent log ingestion with a single ordered drainer.
//!
//! Producers enqueue timestamped [`types::Record`]s into a [`concurrency::queue::BoundedQueue`]
//! and one drainer renders them to a [`sink::Sink`] in queue order. A
//! [`pipeline::Pipeline`] wires these together and terminates them with one of two
//! shutdown protocols: delay-close, which drains everything, or done-signal, which may
//! leave records behind.
//!
//! The crate also provides the synchronization primitives the demo scenarios are built
//! on: a [`concurrency::barrier::JoinBarrier`] and a [`concurrency::counter::GuardedCounter`].

pub mod concurrency;
pub mod error;
mod macros;
pub mod pipeline;
pub mod sink;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod workers;
