//! Process-wide loggers
//!
//! [`init`] installs a configured [`Loggers`] once; otherwise the first use
//! of [`global`] installs the default one (stdout, status on, debug off).
//! The free functions forward to the installed instance.

use crate::core::{
    Arg, ChannelSelector, ErrorReporter, LineFlags, LoggerError, Loggers, Result, Severity, Sink,
};
use std::error::Error;
use std::sync::{Arc, OnceLock};

static LOGGERS: OnceLock<Loggers> = OnceLock::new();

/// Install `loggers` as the process-wide instance.
///
/// Fails with [`LoggerError::AlreadyInitialized`] once an instance is in
/// place, including the default one installed by an earlier log call.
pub fn init(loggers: Loggers) -> Result<()> {
    LOGGERS
        .set(loggers)
        .map_err(|_| LoggerError::AlreadyInitialized)
}

pub fn global() -> &'static Loggers {
    LOGGERS.get_or_init(Loggers::default)
}

#[track_caller]
pub fn error_log(err: &(dyn Error + 'static), args: &[Arg]) {
    global().error_log(err, args);
}

#[track_caller]
pub fn error_stack(err: &(dyn Error + 'static), args: &[Arg]) {
    global().error_stack(err, args);
}

#[track_caller]
pub fn error_log_handler(err: &(dyn Error + 'static), args: &[Arg]) {
    global().error_log_handler(err, args);
}

#[track_caller]
pub fn fatal(err: &(dyn Error + 'static), args: &[Arg]) -> ! {
    global().fatal(err, args)
}

#[track_caller]
pub fn status_log(args: &[Arg]) {
    global().status_log(args);
}

#[track_caller]
pub fn debug_log(args: &[Arg]) {
    global().debug_log(args);
}

pub fn custom_log(
    severity: Severity,
    prefix: &str,
    file: &str,
    line: u32,
    message: &str,
    selectors: &[ChannelSelector],
) {
    global().custom_log(severity, prefix, file, line, message, selectors);
}

pub fn set_writers(sinks: &[Arc<dyn Sink>], selectors: &[ChannelSelector]) {
    global().set_writers(sinks, selectors);
}

pub fn delete_writers(sinks: &[Arc<dyn Sink>], selectors: &[ChannelSelector]) {
    global().delete_writers(sinks, selectors);
}

pub fn set_debug(enabled: bool) -> bool {
    global().set_debug(enabled)
}

pub fn set_status(enabled: bool) -> bool {
    global().set_status(enabled)
}

pub fn set_log_flags(flags: LineFlags) -> LineFlags {
    global().set_log_flags(flags)
}

pub fn set_stack_begin_with(skip: usize) -> usize {
    global().set_stack_begin_with(skip)
}

pub fn set_reporter(reporter: Arc<dyn ErrorReporter>, dsn: &str, org: &str) -> Result<()> {
    global().set_reporter(reporter, dsn, org)
}
