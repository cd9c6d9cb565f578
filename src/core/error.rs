//! Error types for the logging core

use super::sink::Sink;
use std::fmt;
use std::io;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// Configuration could not be parsed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// One or more sinks failed during a broadcast
    #[error(transparent)]
    Broadcast(#[from] MultiSinkError),

    /// Dispatch queue full, the delivery was dropped
    #[error("Dispatch queue full: {capacity} deliveries pending")]
    QueueFull { capacity: usize },

    /// Dispatcher already stopped
    #[error("Dispatcher already stopped")]
    DispatcherStopped,

    /// The process-wide loggers were already installed
    #[error("Loggers already initialized")]
    AlreadyInitialized,

    /// Error reporter could not be initialised
    #[error("Error reporter init failed: {0}")]
    ReporterInit(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn reporter_init<S: Into<String>>(msg: S) -> Self {
        LoggerError::ReporterInit(msg.into())
    }
}

/// Sentinel payload a sink returns to declare itself permanently broken.
///
/// A broadcast that collects this error removes the sink afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sink is broken, it will be removed from MultiSink")]
pub struct PoisonedSink;

/// Build the poison error a broken sink should return from `write`.
pub fn poison_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, PoisonedSink)
}

/// Whether `err` carries the [`PoisonedSink`] payload.
pub fn is_poison(err: &io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.downcast_ref::<PoisonedSink>().is_some())
}

pub(crate) fn short_write(expected: usize, written: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::WriteZero,
        format!("short write: {} of {} bytes", written, expected),
    )
}

/// One failed sink of a broadcast.
pub struct SinkFailure {
    pub sink: Arc<dyn Sink>,
    pub error: io::Error,
}

impl SinkFailure {
    pub fn is_poison(&self) -> bool {
        is_poison(&self.error)
    }
}

impl fmt::Debug for SinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkFailure")
            .field("sink", &self.sink.name())
            .field("error", &self.error)
            .finish()
    }
}

/// Aggregate of the per-sink failures of one broadcast.
///
/// `accepted` is always the full payload length: failures are local to the
/// sinks and delivery to the others went ahead.
#[derive(Debug)]
pub struct MultiSinkError {
    pub accepted: usize,
    pub failures: Vec<SinkFailure>,
}

impl MultiSinkError {
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn has_poison(&self) -> bool {
        self.failures.iter().any(SinkFailure::is_poison)
    }
}

impl fmt::Display for MultiSinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MultiSinkError:")?;
        let mut endl = "";
        for failure in &self.failures {
            write!(f, "{} {}, sink: {}", endl, failure.error, failure.sink.name())?;
            endl = "\n";
        }
        Ok(())
    }
}

impl std::error::Error for MultiSinkError {}

impl From<MultiSinkError> for io::Error {
    fn from(err: MultiSinkError) -> Self {
        io::Error::other(err)
    }
}
