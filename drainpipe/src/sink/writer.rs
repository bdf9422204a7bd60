use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

use crate::drain_error;
use crate::error::{DrainResult, ErrorKind};
use crate::sink::Sink;
use crate::types::Record;

/// Sink writing one newline-terminated line per record to standard output.
pub type StdoutSink = WriterSink<Stdout>;

/// Sink rendering records as text lines into any asynchronous writer.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Runs `f` with access to the underlying writer.
    pub async fn with_writer<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&W) -> R,
    {
        let writer = self.writer.lock().await;
        f(&writer)
    }
}

impl WriterSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> Clone for WriterSink<W> {
    fn clone(&self) -> Self {
        Self {
            writer: self.writer.clone(),
        }
    }
}

impl<W> Sink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name() -> &'static str {
        "writer"
    }

    async fn write_record(&self, record: &Record) -> DrainResult<()> {
        let mut line = record.render();
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await.map_err(|err| {
            drain_error!(
                ErrorKind::SinkIoError,
                "Failed to write record to sink",
                err,
                source: err
            )
        })
    }

    async fn flush(&self) -> DrainResult<()> {
        let mut writer = self.writer.lock().await;
        writer.flush().await.map_err(|err| {
            drain_error!(
                ErrorKind::SinkIoError,
                "Failed to flush sink",
                err,
                source: err
            )
        })
    }
}
