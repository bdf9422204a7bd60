//! Error types and result definitions for pipeline operations.
//!
//! Provides a single error type with classification, aggregation, and captured
//! diagnostic metadata. The [`DrainError`] type supports single errors, errors with
//! additional detail, and multiple aggregated errors when several workers fail at once.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for pipeline operations using [`DrainError`] as the error type.
pub type DrainResult<T> = Result<T, DrainError>;

/// Detailed payload stored for single [`DrainError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for pipeline operations.
///
/// [`DrainError`] can represent a single classified error or an aggregate of several
/// errors, for example when both the drainer and a producer task fail during shutdown.
#[derive(Debug, Clone)]
pub struct DrainError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding rich metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors.
    Many {
        errors: Vec<DrainError>,
        location: &'static Location<'static>,
    },
}

/// Categories of errors that can occur while ingesting and draining records.
///
/// Protocol errors such as [`ErrorKind::QueueClosed`] are ordinary values callers are
/// expected to branch on. Misuse of the join barrier is not represented here since it
/// panics at the offending call site.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Queue Errors
    QueueClosed,

    // Sink Errors
    SinkIoError,

    // Worker Errors
    DrainerPanic,
    DrainerCancelled,
    ProducerPanic,
    InvalidState,

    // Configuration Errors
    ConfigError,

    // IO Errors
    IoError,

    // Unknown / Uncategorized
    Unknown,
}

impl DrainError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattening aggregates.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the static description of this error.
    ///
    /// Aggregates return the description of their first error.
    pub fn description(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.description.as_ref()),
            ErrorRepr::Many { ref errors, .. } => errors.first().and_then(|e| e.description()),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// Has no effect on aggregated errors, which forward their first error as the source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }

        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        DrainError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for DrainError {
    fn eq(&self, other: &DrainError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (
                ErrorRepr::Many {
                    errors: errors_a, ..
                },
                ErrorRepr::Many {
                    errors: errors_b, ..
                },
            ) => errors_a == errors_b,
            _ => false,
        }
    }
}

impl fmt::Display for DrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if let Some(detail) = payload.detail.as_deref() {
                    write!(f, "\n  Detail:")?;
                    for line in detail.lines() {
                        write!(f, "\n    {line}")?;
                    }
                }

                let rendered_backtrace = payload.backtrace.to_string();
                if !rendered_backtrace.trim().is_empty()
                    && payload.backtrace.status() == std::backtrace::BacktraceStatus::Captured
                {
                    write!(f, "\n  Backtrace:")?;
                    for line in rendered_backtrace.lines() {
                        write!(f, "\n    {line}")?;
                    }
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = error.to_string();
                    let mut lines = rendered.lines();
                    if let Some(first_line) = lines.next() {
                        write!(f, "\n  {}. {}", index + 1, first_line)?;
                    }
                    for line in lines {
                        write!(f, "\n     {line}")?;
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for DrainError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source.as_ref() as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Creates a [`DrainError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for DrainError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> DrainError {
        DrainError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`DrainError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for DrainError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> DrainError {
        DrainError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Creates a [`DrainError`] from a vector of errors for aggregation.
///
/// A vector with exactly one error yields that error unchanged.
impl<E> From<Vec<E>> for DrainError
where
    E: Into<DrainError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> DrainError {
        let location = Location::caller();

        let mut errors: Vec<DrainError> = errors.into_iter().map(Into::into).collect();
        if errors.len() == 1
            && let Some(error) = errors.pop()
        {
            return error;
        }

        DrainError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] to [`DrainError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for DrainError {
    #[track_caller]
    fn from(err: std::io::Error) -> DrainError {
        let detail = err.to_string();
        DrainError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts a failed [`tokio::task::JoinError`] to [`DrainError`].
///
/// Panics map to [`ErrorKind::Unknown`] here; callers that know which task panicked
/// should build a more specific error instead.
impl From<tokio::task::JoinError> for DrainError {
    #[track_caller]
    fn from(err: tokio::task::JoinError) -> DrainError {
        let description = if err.is_cancelled() {
            "Task was cancelled"
        } else {
            "Task panicked"
        };
        let detail = err.to_string();
        DrainError::from_components(
            ErrorKind::Unknown,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bail, drain_error};

    fn failing() -> DrainResult<()> {
        bail!(ErrorKind::QueueClosed, "Queue is closed", "capacity was 50");
    }

    #[test]
    fn single_error_exposes_kind_and_detail() {
        let err = failing().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::QueueClosed);
        assert_eq!(err.kinds(), vec![ErrorKind::QueueClosed]);
        assert_eq!(err.description(), Some("Queue is closed"));
        assert_eq!(err.detail(), Some("capacity was 50"));
        assert!(err.location().file().ends_with("error.rs"));
    }

    #[test]
    fn aggregate_flattens_kinds() {
        let err: DrainError = vec![
            drain_error!(ErrorKind::DrainerPanic, "Drainer panicked"),
            drain_error!(ErrorKind::SinkIoError, "Sink write failed"),
        ]
        .into();

        assert_eq!(err.kind(), ErrorKind::DrainerPanic);
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::DrainerPanic, ErrorKind::SinkIoError]
        );
        assert!(err.to_string().starts_with("[Many] 2 errors aggregated"));
    }

    #[test]
    fn aggregate_of_one_unwraps() {
        let err: DrainError = vec![drain_error!(ErrorKind::ConfigError, "Invalid capacity")].into();

        assert_eq!(err.kind(), ErrorKind::ConfigError);
        assert!(err.backtrace().is_some());
    }

    #[test]
    fn io_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = DrainError::from(io);

        assert_eq!(err.kind(), ErrorKind::IoError);
        assert_eq!(err.detail(), Some("pipe closed"));
        assert!(error::Error::source(&err).is_some());
    }
}
