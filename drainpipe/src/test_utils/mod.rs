//! Helpers for tests of drain pipelines.

pub mod notify;
pub mod sink;
