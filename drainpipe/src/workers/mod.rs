pub mod base;
pub mod drainer;
pub mod producer;
