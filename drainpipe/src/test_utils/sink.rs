use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Notify, RwLock};

use crate::bail;
use crate::error::{DrainResult, ErrorKind};
use crate::sink::Sink;
use crate::test_utils::notify::TimedNotify;
use crate::types::Record;

type RecordCondition = Box<dyn Fn(&[Record]) -> bool + Send + Sync>;

struct Inner<K> {
    wrapped_sink: K,
    records: Vec<Record>,
    conditions: Vec<(RecordCondition, Arc<Notify>)>,
    flush_called: bool,
}

impl<K> Inner<K> {
    fn check_conditions(&mut self) {
        let records = &self.records;
        self.conditions.retain(|(condition, notify)| {
            let should_retain = !condition(records);
            if !should_retain {
                // `notify_one` stores a permit, so a waiter registering late still wakes.
                notify.notify_one();
            }
            should_retain
        });
    }
}

/// Wraps a sink and records everything that flows through it.
///
/// Tests register conditions with [`TestSinkWrapper::notify_on_records`] and await them
/// instead of sleeping.
#[derive(Clone)]
pub struct TestSinkWrapper<K> {
    inner: Arc<RwLock<Inner<K>>>,
}

impl<K> TestSinkWrapper<K> {
    pub fn wrap(sink: K) -> Self {
        let inner = Inner {
            wrapped_sink: sink,
            records: Vec::new(),
            conditions: Vec::new(),
            flush_called: false,
        };

        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Returns every record written so far.
    pub async fn records(&self) -> Vec<Record> {
        self.inner.read().await.records.clone()
    }

    pub async fn flush_called(&self) -> bool {
        self.inner.read().await.flush_called
    }

    /// Returns a notification that fires once `condition` holds for the written records.
    pub async fn notify_on_records<F>(&self, condition: F) -> TimedNotify
    where
        F: Fn(&[Record]) -> bool + Send + Sync + 'static,
    {
        let notify = Arc::new(Notify::new());
        let mut inner = self.inner.write().await;
        inner.conditions.push((Box::new(condition), notify.clone()));
        inner.check_conditions();

        TimedNotify::new(notify)
    }

    /// Returns a notification that fires once at least `count` records were written.
    pub async fn wait_for_records(&self, count: usize) -> TimedNotify {
        self.notify_on_records(move |records| records.len() >= count)
            .await
    }
}

impl<K> Sink for TestSinkWrapper<K>
where
    K: Sink + Send + Sync,
{
    fn name() -> &'static str {
        "test_wrapper"
    }

    async fn write_record(&self, record: &Record) -> DrainResult<()> {
        let mut inner = self.inner.write().await;

        let result = inner.wrapped_sink.write_record(record).await;
        if result.is_ok() {
            inner.records.push(record.clone());
            inner.check_conditions();
        }

        result
    }

    async fn flush(&self) -> DrainResult<()> {
        let mut inner = self.inner.write().await;
        inner.flush_called = true;

        inner.wrapped_sink.flush().await
    }
}

/// Sink that accepts a fixed number of records and then fails every write.
#[derive(Debug, Clone)]
pub struct FailingSink {
    accept: u64,
    written: Arc<AtomicU64>,
}

impl FailingSink {
    pub fn new(accept: u64) -> Self {
        Self {
            accept,
            written: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Acquire)
    }
}

impl Sink for FailingSink {
    fn name() -> &'static str {
        "failing"
    }

    async fn write_record(&self, _record: &Record) -> DrainResult<()> {
        if self.written.load(Ordering::Acquire) >= self.accept {
            bail!(
                ErrorKind::SinkIoError,
                "Sink refused record",
                format!("sink accepts at most {} records", self.accept)
            );
        }

        self.written.fetch_add(1, Ordering::AcqRel);

        Ok(())
    }
}
