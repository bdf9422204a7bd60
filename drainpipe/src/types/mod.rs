mod record;

pub use record::{RECORD_TIMESTAMP_FORMAT, Record, Severity};
