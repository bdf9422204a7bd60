use chrono::{DateTime, Local};
use std::fmt;

/// Timestamp layout used when rendering a [`Record`].
pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Severity attached to every [`Record`].
///
/// Severities are labels only, the pipeline never orders or filters by them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Returns the label used in rendered lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured event flowing from a producer through the queue to the drainer.
///
/// A [`Record`] is immutable once built. The timestamp is captured at construction time,
/// not when the record is drained, so queueing latency never shifts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    timestamp: DateTime<Local>,
    severity: Severity,
    message: String,
}

impl Record {
    /// Creates a record stamped with the current local time.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self::at(Local::now(), severity, message)
    }

    /// Creates a record with an explicit timestamp.
    pub fn at(timestamp: DateTime<Local>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            severity,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the record as `<timestamp> - [<SEVERITY>] <message>`, without a newline.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - [{}] {}",
            self.timestamp.format(RECORD_TIMESTAMP_FORMAT),
            self.severity,
            self.message
        )
    }
}
