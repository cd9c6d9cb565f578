//! The three leveled channels and the entry points that drive them

use super::args::{render_args, write_arg, write_args, Arg};
use super::channel::{Channel, ChannelKind};
use super::config::{LineFlags, LoggerConfig};
use super::dispatcher::{Dispatcher, DEFAULT_SHUTDOWN_TIMEOUT};
use super::error::Result;
use super::frames::{resolve_caller, stack_trace_of, Frame, IgnoreRules, StackTrace, STACK_MARKER};
use super::reporter::{ErrorReporter, ReporterLink, REPORT_FLUSH_TIMEOUT};
use super::severity::Severity;
use super::sink::Sink;
use crate::sinks::StdoutSink;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Which channels a sink operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelSelector {
    All,
    ErrorOnly,
    StatusOnly,
    DebugOnly,
}

/// Error, status and debug channels sharing one dispatcher.
pub struct Loggers {
    error: Channel,
    status: Channel,
    debug: Channel,
    debug_enabled: AtomicBool,
    status_enabled: AtomicBool,
    stack_begin_with: AtomicUsize,
    ignore: RwLock<IgnoreRules>,
    reporter: RwLock<Option<ReporterLink>>,
    dispatcher: Arc<Dispatcher>,
}

impl Loggers {
    /// Channels writing to stdout, configured by `config`.
    pub fn new(config: LoggerConfig) -> Self {
        Self::assemble(config, Arc::new(StdoutSink), Arc::new(StdoutSink))
    }

    #[must_use]
    pub fn builder() -> LoggersBuilder {
        LoggersBuilder::new()
    }

    fn assemble(config: LoggerConfig, primary: Arc<dyn Sink>, raw: Arc<dyn Sink>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(config.dispatch_queue, config.dispatch_workers));
        let channel = |kind, depth| {
            Channel::new(
                kind,
                Arc::clone(&primary),
                Arc::clone(&raw),
                Arc::clone(&dispatcher),
                config.line_flags,
                depth,
            )
        };

        Self {
            error: channel(ChannelKind::Error, config.error_call_depth),
            status: channel(ChannelKind::Status, 0),
            debug: channel(ChannelKind::Debug, 0),
            debug_enabled: AtomicBool::new(config.debug),
            status_enabled: AtomicBool::new(config.status),
            stack_begin_with: AtomicUsize::new(config.stack_begin_with),
            ignore: RwLock::new(config.ignore),
            reporter: RwLock::new(None),
            dispatcher,
        }
    }

    pub fn channel(&self, kind: ChannelKind) -> &Channel {
        match kind {
            ChannelKind::Error => &self.error,
            ChannelKind::Status => &self.status,
            ChannelKind::Debug => &self.debug,
        }
    }

    fn select(&self, selectors: &[ChannelSelector]) -> Vec<&Channel> {
        let mut picked = [false; 3];
        for selector in selectors {
            match selector {
                ChannelSelector::All => picked = [true; 3],
                ChannelSelector::ErrorOnly => picked[0] = true,
                ChannelSelector::StatusOnly => picked[1] = true,
                ChannelSelector::DebugOnly => picked[2] = true,
            }
        }

        [&self.error, &self.status, &self.debug]
            .into_iter()
            .zip(picked)
            .filter_map(|(channel, on)| on.then_some(channel))
            .collect()
    }

    /// Add `sinks` to the selected channels.
    pub fn set_writers(&self, sinks: &[Arc<dyn Sink>], selectors: &[ChannelSelector]) {
        for channel in self.select(selectors) {
            channel.add_sinks(sinks);
        }
    }

    /// Remove `sinks` from the selected channels.
    pub fn delete_writers(&self, sinks: &[Arc<dyn Sink>], selectors: &[ChannelSelector]) {
        for channel in self.select(selectors) {
            channel.delete_sinks(sinks);
        }
    }

    pub fn set_debug(&self, enabled: bool) -> bool {
        self.debug_enabled.swap(enabled, Ordering::Relaxed)
    }

    pub fn set_status(&self, enabled: bool) -> bool {
        self.status_enabled.swap(enabled, Ordering::Relaxed)
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled.load(Ordering::Relaxed)
    }

    pub fn status_enabled(&self) -> bool {
        self.status_enabled.load(Ordering::Relaxed)
    }

    /// Set the decoration flags of every channel. Returns the error
    /// channel's previous flags.
    pub fn set_log_flags(&self, flags: LineFlags) -> LineFlags {
        self.status.set_flags(flags);
        self.debug.set_flags(flags);
        self.error.set_flags(flags)
    }

    /// Frames skipped at the top of live stack dumps. Returns the old value.
    pub fn set_stack_begin_with(&self, skip: usize) -> usize {
        self.stack_begin_with.swap(skip, Ordering::Relaxed)
    }

    pub fn stack_begin_with(&self) -> usize {
        self.stack_begin_with.load(Ordering::Relaxed)
    }

    pub fn set_ignore_rules(&self, rules: IgnoreRules) -> IgnoreRules {
        std::mem::replace(&mut *self.ignore.write(), rules)
    }

    pub fn ignore_rules(&self) -> IgnoreRules {
        self.ignore.read().clone()
    }

    /// Initialise `reporter` against `dsn` and attach it to the error channel.
    ///
    /// On failure the previous reporter, if any, stays attached.
    pub fn set_reporter(&self, reporter: Arc<dyn ErrorReporter>, dsn: &str, org: &str) -> Result<()> {
        let link = ReporterLink::connect(reporter, dsn, org)?;
        *self.reporter.write() = Some(link);
        Ok(())
    }

    /// Log `err` with `args` on the error channel.
    ///
    /// The line is attributed to the first unignored frame of the error's
    /// captured trace when it has one, else to the caller.
    #[track_caller]
    pub fn error_log(&self, err: &(dyn Error + 'static), args: &[Arg]) {
        self.log_error(Location::caller(), err, args);
    }

    /// Like [`error_log`](Self::error_log), doing nothing for `None`.
    #[track_caller]
    pub fn error_log_opt(&self, err: Option<&(dyn Error + 'static)>, args: &[Arg]) {
        if let Some(err) = err {
            self.log_error(Location::caller(), err, args);
        }
    }

    /// Log `err` with `args` followed by a stack dump.
    #[track_caller]
    pub fn error_stack(&self, err: &(dyn Error + 'static), args: &[Arg]) {
        self.log_stack(Location::caller(), err, args);
    }

    #[track_caller]
    pub fn error_log_handler(&self, err: &(dyn Error + 'static), args: &[Arg]) {
        self.log_stack(Location::caller(), err, args);
    }

    /// Log `err` with a stack dump and exit the process with status 1.
    #[track_caller]
    pub fn fatal(&self, err: &(dyn Error + 'static), args: &[Arg]) -> ! {
        self.log_fatal(Location::caller(), err, args);

        if let Some(link) = self.reporter.read().as_ref() {
            link.flush(REPORT_FLUSH_TIMEOUT);
        }
        self.wait_idle(DEFAULT_SHUTDOWN_TIMEOUT);
        std::process::exit(1)
    }

    #[track_caller]
    pub fn status_log(&self, args: &[Arg]) {
        if self.status_enabled() {
            self.status.printf(args);
        }
    }

    #[track_caller]
    pub fn debug_log(&self, args: &[Arg]) {
        if self.debug_enabled() {
            self.debug.printf(args);
        }
    }

    /// Emit a pre-decorated `[[PREFIX]]<time>file:line: message` line on
    /// the selected channels, whatever their toggles.
    pub fn custom_log(
        &self,
        severity: Severity,
        prefix: &str,
        file: &str,
        line: u32,
        message: &str,
        selectors: &[ChannelSelector],
    ) {
        let text = format!(
            "{}{}{}:{}: {}",
            severity.paint(prefix),
            self.error.flags().time_prefix(),
            file,
            line,
            message
        );
        let site = Frame::new(file, line, "");
        for channel in self.select(selectors) {
            channel.emit_line(true, &text, &site);
        }
    }

    /// Wait for queued fan-out deliveries. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.dispatcher.wait_idle(timeout)
    }

    fn report(&self, err: &(dyn Error + 'static)) -> Option<String> {
        self.reporter.read().as_ref().map(|link| link.report(err))
    }

    fn log_error(&self, location: &Location<'_>, err: &(dyn Error + 'static), args: &[Arg]) {
        let mut message = error_message(err, args);
        if let Some(url) = self.report(err) {
            message.push_str(&url);
        }

        let rules = self.ignore_rules();
        let channel = &self.error;
        let mut state = channel.attribution();

        if let Some(frame) = stack_trace_of(err).and_then(|trace| trace.first_unignored(&rules)) {
            state.set(frame, 0);
            let line = format!(
                "{}{}{}:{}: {}() {}",
                channel.prefix(),
                channel.flags().time_prefix(),
                frame.short_file(),
                frame.line,
                frame.short_function(),
                message
            );
            channel.emit_line(true, &line, frame);
            return;
        }

        let caller = resolve_caller(location, &rules, channel.call_depth());
        state.set(&caller.frame, caller.depth);
        let text = match caller.frame.short_function() {
            "" => message,
            function => format!("{}() {}", function, message),
        };
        channel.emit_line(false, &text, &caller.frame);
    }

    fn log_stack(&self, location: &Location<'_>, err: &(dyn Error + 'static), args: &[Arg]) {
        let rules = self.ignore_rules();
        let mut text = String::from(STACK_MARKER);
        text.push_str(&error_message(err, args));
        text.push('\n');

        match stack_trace_of(err) {
            Some(trace) => trace.write_dump(&mut text, &rules),
            None => {
                let live = StackTrace::capture_from(location);
                let frames = live.frames().iter().skip(self.stack_begin_with()).cloned().collect();
                StackTrace::from_frames(frames).write_dump(&mut text, &rules);
            }
        }

        let _state = self.error.attribution();
        self.error
            .emit_line(true, text.trim_end_matches('\n'), &Frame::from_location(location));
    }

    pub(crate) fn log_fatal(&self, location: &Location<'_>, err: &(dyn Error + 'static), args: &[Arg]) {
        let rules = self.ignore_rules();
        let caller = resolve_caller(location, &rules, 0);
        let function = match caller.frame.short_function() {
            "" => format!("{}:{}", caller.frame.short_file(), caller.frame.line),
            function => function.to_string(),
        };

        let line = format!(
            "{}{}{} {} {}",
            Severity::Critical.paint("FATAL"),
            self.error.flags().time_prefix(),
            function,
            render_args(&[Arg::error(err)]),
            render_args(args)
        );

        {
            let _state = self.error.attribution();
            self.error.emit_line(true, line.trim_end(), &caller.frame);
        }
        self.log_stack(location, err, args);
    }
}

impl Default for Loggers {
    fn default() -> Self {
        Self::new(LoggerConfig::default())
    }
}

impl std::fmt::Debug for Loggers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loggers")
            .field("error", &self.error)
            .field("status", &self.status)
            .field("debug", &self.debug)
            .field("debug_enabled", &self.debug_enabled())
            .field("status_enabled", &self.status_enabled())
            .field("reporter", &*self.reporter.read())
            .finish()
    }
}

/// `<err>` or `<err>,<args>`, the args going through the format string if
/// they start with one.
fn error_message(err: &(dyn Error + 'static), args: &[Arg]) -> String {
    let mut buf = String::new();
    write_arg(&mut buf, &Arg::error(err));
    if !args.is_empty() {
        buf.push(',');
        write_args(&mut buf, args);
    }
    buf
}

/// Builder for [`Loggers`]
///
/// # Example
/// ```
/// use logfan::core::{LineFlags, Loggers};
/// use logfan::sinks::MemorySink;
/// use std::sync::Arc;
///
/// let out = Arc::new(MemorySink::new());
/// let loggers = Loggers::builder()
///     .primary(out.clone())
///     .line_flags(LineFlags::NONE)
///     .debug(true)
///     .build()
///     .unwrap();
///
/// loggers.debug_log(&logfan::args!["%d workers", 4]);
/// assert_eq!(out.contents(), "[[DEBUG]]4 workers\n");
/// ```
pub struct LoggersBuilder {
    config: LoggerConfig,
    primary: Option<Arc<dyn Sink>>,
    raw: Option<Arc<dyn Sink>>,
    reporter: Option<(Arc<dyn ErrorReporter>, String, String)>,
}

impl LoggersBuilder {
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
            primary: None,
            raw: None,
            reporter: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn status(mut self, enabled: bool) -> Self {
        self.config.status = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn line_flags(mut self, flags: LineFlags) -> Self {
        self.config.line_flags = flags;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn ignore_rules(mut self, rules: IgnoreRules) -> Self {
        self.config.ignore = rules;
        self
    }

    /// Destination of decorated lines. Also receives raw lines unless
    /// [`raw_output`](Self::raw_output) is set. Defaults to stdout.
    #[must_use = "builder methods return a new value"]
    pub fn primary(mut self, sink: Arc<dyn Sink>) -> Self {
        self.primary = Some(sink);
        self
    }

    /// Destination of pre-decorated lines (stack dumps, custom lines).
    #[must_use = "builder methods return a new value"]
    pub fn raw_output(mut self, sink: Arc<dyn Sink>) -> Self {
        self.raw = Some(sink);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>, dsn: &str, org: &str) -> Self {
        self.reporter = Some((reporter, dsn.to_string(), org.to_string()));
        self
    }

    pub fn build(self) -> Result<Loggers> {
        self.config.validate()?;

        let primary: Arc<dyn Sink> = self.primary.unwrap_or_else(|| Arc::new(StdoutSink));
        let raw = self.raw.unwrap_or_else(|| Arc::clone(&primary));
        let loggers = Loggers::assemble(self.config, primary, raw);

        if let Some((reporter, dsn, org)) = self.reporter {
            loggers.set_reporter(reporter, &dsn, &org)?;
        }
        Ok(loggers)
    }
}

impl Default for LoggersBuilder {
    fn default() -> Self {
        Self::new()
    }
}
