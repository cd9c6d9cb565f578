//! Macros for building argument lists and logging through them.
//!
//! Each value is converted with `Arg::from`, so strings, numbers, errors
//! rendered with `Arg::error` and nested lists mix freely. The first
//! argument is used as a printf-style format when it contains a
//! conversion.
//!
//! # Examples
//!
//! ```
//! use logfan::core::{LineFlags, Loggers};
//! use logfan::sinks::MemorySink;
//! use std::sync::Arc;
//!
//! let out = Arc::new(MemorySink::new());
//! let loggers = Loggers::builder()
//!     .primary(out.clone())
//!     .line_flags(LineFlags::NONE)
//!     .build()
//!     .unwrap();
//!
//! logfan::status_log!(loggers; "user %s logged in", "ann");
//! logfan::status_log!(loggers; "queue", 3, true);
//! assert_eq!(out.lines(), ["[[INFO]]user ann logged in", "[[INFO]]queue,3,true"]);
//! ```

/// Build a `Vec<Arg>`.
///
/// # Examples
///
/// ```
/// use logfan::core::render_args;
///
/// let args = logfan::args!["%s=%d", "retries", 3];
/// assert_eq!(render_args(&args), "retries=3");
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::core::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::core::Arg::from($arg)),+]
    };
}

/// Log on the status channel, of `loggers;` or of the process-wide loggers.
#[macro_export]
macro_rules! status_log {
    ($loggers:expr; $($arg:expr),+ $(,)?) => {
        $loggers.status_log(&$crate::args![$($arg),+])
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::global::status_log(&$crate::args![$($arg),+])
    };
}

/// Log on the debug channel, of `loggers;` or of the process-wide loggers.
#[macro_export]
macro_rules! debug_log {
    ($loggers:expr; $($arg:expr),+ $(,)?) => {
        $loggers.debug_log(&$crate::args![$($arg),+])
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::global::debug_log(&$crate::args![$($arg),+])
    };
}

/// Log an error and optional arguments on the error channel.
///
/// ```
/// use logfan::core::{LineFlags, Loggers};
/// use logfan::sinks::MemorySink;
/// use std::sync::Arc;
///
/// let out = Arc::new(MemorySink::new());
/// let loggers = Loggers::builder()
///     .primary(out.clone())
///     .line_flags(LineFlags::NONE)
///     .build()
///     .unwrap();
///
/// let err = std::io::Error::new(std::io::ErrorKind::NotFound, "no config");
/// logfan::error_log!(loggers; err, "path %s", "/etc/app.toml");
/// assert!(out.contents().ends_with("no config,path /etc/app.toml\n"));
/// ```
#[macro_export]
macro_rules! error_log {
    ($loggers:expr; $err:expr $(, $arg:expr)* $(,)?) => {
        $loggers.error_log(&$err, &$crate::args![$($arg),*])
    };
    ($err:expr $(, $arg:expr)* $(,)?) => {
        $crate::global::error_log(&$err, &$crate::args![$($arg),*])
    };
}

/// Log an error with a stack dump on the error channel.
#[macro_export]
macro_rules! error_stack {
    ($loggers:expr; $err:expr $(, $arg:expr)* $(,)?) => {
        $loggers.error_stack(&$err, &$crate::args![$($arg),*])
    };
    ($err:expr $(, $arg:expr)* $(,)?) => {
        $crate::global::error_stack(&$err, &$crate::args![$($arg),*])
    };
}
