use std::future::Future;

use crate::error::DrainResult;
use crate::types::Record;

/// Output target for drained records.
///
/// [`Sink`] implementations define where rendered records end up. The drainer calls
/// [`Sink::write_record`] once per record, strictly in queue order and never
/// concurrently, so implementations do not need to reorder anything.
///
/// The optional [`Sink::flush`] method is called once after the drainer stops, with a
/// default no-op implementation.
pub trait Sink {
    /// Returns the name of the sink.
    fn name() -> &'static str;

    /// Writes one record to the sink.
    ///
    /// Line-oriented sinks write the output of [`Record::render`] followed by a newline.
    fn write_record(&self, record: &Record) -> impl Future<Output = DrainResult<()>> + Send;

    /// Flushes buffered output, if any.
    fn flush(&self) -> impl Future<Output = DrainResult<()>> + Send {
        async { Ok(()) }
    }
}
