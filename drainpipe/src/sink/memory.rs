use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::DrainResult;
use crate::sink::Sink;
use crate::types::Record;

/// In-memory sink for testing and development purposes.
///
/// [`MemorySink`] keeps every record it receives, in arrival order. Clones share the
/// same storage, so a test can hand one clone to a pipeline and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all records written so far.
    pub async fn records(&self) -> Vec<Record> {
        self.records.lock().await.clone()
    }

    /// Returns all records written so far, rendered as log lines.
    pub async fn lines(&self) -> Vec<String> {
        self.records
            .lock()
            .await
            .iter()
            .map(Record::render)
            .collect()
    }
}

impl Sink for MemorySink {
    fn name() -> &'static str {
        "memory"
    }

    async fn write_record(&self, record: &Record) -> DrainResult<()> {
        let mut records = self.records.lock().await;

        debug!(severity = %record.severity(), "storing record in memory sink");
        records.push(record.clone());

        Ok(())
    }
}
