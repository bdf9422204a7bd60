mod base;
pub mod memory;
pub mod writer;

pub use base::Sink;
