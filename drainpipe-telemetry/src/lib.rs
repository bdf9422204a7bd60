//! Tracing setup shared by the drainpipe binaries and test suites.

pub mod tracing;
