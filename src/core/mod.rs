//! Core types: sink registry, formatter, frames and channels

pub mod args;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod frames;
pub mod loggers;
pub mod multi_sink;
pub mod reporter;
pub mod severity;
pub mod sink;

pub use args::{render_args, Arg, LogRender, Value, TIMESTAMP_LAYOUT};
pub use channel::{Attribution, Channel, ChannelKind};
pub use config::{LineFlags, LoggerConfig, DEFAULT_DISPATCH_QUEUE, DEFAULT_DISPATCH_WORKERS};
pub use dispatcher::{Delivery, Dispatcher, DEFAULT_SHUTDOWN_TIMEOUT};
pub use error::{is_poison, poison_error, LoggerError, MultiSinkError, PoisonedSink, Result, SinkFailure};
pub use frames::{
    parse_backtrace, resolve_caller, stack_trace_of, Caller, Frame, IgnoreRules, StackTrace,
    StackTracer, TracedError, STACK_MARKER,
};
pub use loggers::{ChannelSelector, Loggers, LoggersBuilder};
pub use multi_sink::MultiSink;
pub use reporter::{ErrorReporter, ReporterLink, REPORT_FLUSH_TIMEOUT};
pub use severity::Severity;
pub use sink::{same_sink, Sink};
