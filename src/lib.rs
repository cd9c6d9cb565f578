//! # logfan
//!
//! Process-local logging core: leveled error, status and debug channels that
//! write to a primary destination and fan every line out to a mutable set of
//! sinks.
//!
//! ## Features
//!
//! - **Broadcast registry**: [`MultiSink`] writes to every sink, aggregates
//!   failures and drops sinks that declare themselves broken
//! - **Caller attribution**: lines name the file, line and function of the
//!   first frame outside logging helpers
//! - **Non-blocking fan-out**: sink writes run on dispatcher threads
//!
//! ```
//! use logfan::core::{LineFlags, Loggers, Sink};
//! use logfan::sinks::MemorySink;
//! use logfan::ChannelSelector;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let primary = Arc::new(MemorySink::new());
//! let audit = Arc::new(MemorySink::new());
//!
//! let loggers = Loggers::builder()
//!     .primary(primary.clone())
//!     .line_flags(LineFlags::NONE)
//!     .build()
//!     .unwrap();
//! loggers.set_writers(&[audit.clone() as Arc<dyn Sink>], &[ChannelSelector::All]);
//!
//! loggers.status_log(&logfan::args!["listening on %d", 8080]);
//! assert!(loggers.wait_idle(Duration::from_secs(1)));
//!
//! assert_eq!(primary.contents(), "[[INFO]]listening on 8080\n");
//! assert!(audit.contents().ends_with("listening on 8080\n"));
//! ```

pub mod core;
pub mod global;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        Arg, ChannelSelector, ErrorReporter, IgnoreRules, LineFlags, LogRender, LoggerConfig,
        LoggerError, Loggers, LoggersBuilder, MultiSink, MultiSinkError, Result, Severity, Sink,
        TracedError,
    };
    pub use crate::sinks::{MemorySink, StderrSink, StdoutSink, WriterSink};
}

pub use crate::core::{
    poison_error, Arg, ChannelSelector, ErrorReporter, IgnoreRules, LineFlags, LogRender,
    LoggerConfig, LoggerError, Loggers, LoggersBuilder, MultiSink, MultiSinkError, Result,
    Severity, Sink, TracedError, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use global::{
    custom_log, debug_log, delete_writers, error_log, error_log_handler, error_stack, fatal,
    global, init, set_debug, set_log_flags, set_reporter, set_stack_begin_with, set_status,
    set_writers, status_log,
};
