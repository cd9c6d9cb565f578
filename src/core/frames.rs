//! Stack frames, ignore rules and caller attribution
//!
//! Attribution skips frames that belong to logging wrappers, error renderers
//! or the Rust runtime. A frame is skipped when its short file name starts
//! with one of the ignored file prefixes, or when its function is one of the
//! ignored names, either exactly or as the last path segment(s) after a `.`
//! or `::` separator.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;
use std::panic::Location;
use std::sync::OnceLock;

/// Marker used in stack dumps, `file:line [[ERR_STACK]] function()`.
pub const STACK_MARKER: &str = "[[ERR_STACK]]";

const DEFAULT_IGNORE_FILES: &[&str] = &[
    "backtrace.rs",
    "libunwind.rs",
    "panicking.rs",
    "panic.rs",
    "unwind_safe.rs",
    "function.rs",
    "boxed.rs",
    "rt.rs",
];

const DEFAULT_IGNORE_FUNCTIONS: &[&str] = &[
    "Backtrace::create",
    "Backtrace::force_capture",
    "StackTrace::capture",
    "StackTrace::capture_from",
    "TracedError::new",
    "TracedError::wrap",
    "resolve_caller",
    "__rust_begin_short_backtrace",
    "__rust_end_short_backtrace",
    "lang_start",
    "lang_start_internal",
    "rust_panic_with_hook",
    "begin_panic_handler",
    "run_test_in_process",
    "__libc_start_call_main",
    "__libc_start_main",
    "_start",
    "start_thread",
    "clone",
    "clone3",
];

/// One stack location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl Frame {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }

    /// Frame for a `#[track_caller]` location; the function is unknown.
    pub fn from_location(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line(), "")
    }

    /// File name without directories.
    pub fn short_file(&self) -> &str {
        short_file(&self.file)
    }

    /// Last two path segments of the function, `module::function`.
    pub fn short_function(&self) -> &str {
        short_function(&self.function)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} {}()",
            self.short_file(),
            self.line,
            STACK_MARKER,
            self.short_function()
        )
    }
}

pub fn short_file(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

pub fn short_function(name: &str) -> &str {
    let mut cut = name.len();
    for _ in 0..2 {
        match name[..cut].rfind("::") {
            Some(i) => cut = i,
            None => return name,
        }
    }
    &name[cut + 2..]
}

/// File-name prefixes and function-name suffixes excluded from attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreRules {
    pub files: Vec<String>,
    pub functions: Vec<String>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            files: DEFAULT_IGNORE_FILES.iter().map(|s| s.to_string()).collect(),
            functions: DEFAULT_IGNORE_FUNCTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl IgnoreRules {
    /// Rules that ignore nothing.
    pub fn empty() -> Self {
        Self {
            files: Vec::new(),
            functions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_file(mut self, prefix: impl Into<String>) -> Self {
        self.files.push(prefix.into());
        self
    }

    #[must_use]
    pub fn with_function(mut self, suffix: impl Into<String>) -> Self {
        self.functions.push(suffix.into());
        self
    }

    pub fn is_ignored_file(&self, file: &str) -> bool {
        let file = short_file(file);
        self.files
            .iter()
            .any(|name| file == name || file.starts_with(name.as_str()))
    }

    pub fn is_ignored_function(&self, function: &str) -> bool {
        self.functions.iter().any(|name| {
            function == name
                || function
                    .strip_suffix(name.as_str())
                    .is_some_and(|head| head.ends_with('.') || head.ends_with("::"))
        })
    }

    /// Frames without a known file can't be attributed and are skipped too.
    pub fn is_ignored(&self, frame: &Frame) -> bool {
        frame.file.is_empty()
            || self.is_ignored_file(&frame.file)
            || self.is_ignored_function(&frame.function)
    }
}

/// An ordered list of frames, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTrace {
    frames: Vec<Frame>,
}

impl StackTrace {
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// Capture the live stack starting at the caller of this function.
    #[track_caller]
    pub fn capture() -> Self {
        Self::capture_from(Location::caller())
    }

    /// Capture the live stack and drop every frame inside `location`'s
    /// callee chain. When no captured frame matches `location` (stripped
    /// debug info, heavy inlining) the whole trace is kept.
    pub fn capture_from(location: &Location<'_>) -> Self {
        let rendered = Backtrace::force_capture().to_string();
        let mut frames = parse_backtrace(&rendered);

        let file = normalize_path(location.file());
        let anchor = frames
            .iter()
            .position(|f| normalize_path(&f.file).ends_with(file) && f.line == location.line())
            .or_else(|| {
                frames
                    .iter()
                    .position(|f| !f.file.is_empty() && normalize_path(&f.file).ends_with(file))
            });

        if let Some(anchor) = anchor {
            frames.drain(..anchor);
        }
        Self { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// First frame not matched by `rules`.
    pub fn first_unignored<'a>(&'a self, rules: &'a IgnoreRules) -> Option<&'a Frame> {
        self.unignored(rules).next()
    }

    pub fn unignored<'a>(&'a self, rules: &'a IgnoreRules) -> impl Iterator<Item = &'a Frame> + 'a {
        self.frames.iter().filter(move |frame| !rules.is_ignored(frame))
    }

    /// One `file:line [[ERR_STACK]] function()` line per unignored frame.
    pub fn write_dump(&self, buf: &mut String, rules: &IgnoreRules) {
        for frame in self.unignored(rules) {
            buf.push_str(&frame.to_string());
            buf.push('\n');
        }
    }
}

fn normalize_path(path: &str) -> &str {
    path.trim_start_matches("./")
}

fn re_symbol() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+:\s+(.+?)\s*$").expect("symbol pattern is valid"))
}

fn re_location() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s+at\s+(.+?):(\d+)(?::\d+)?\s*$").expect("location pattern is valid")
    })
}

fn re_hash() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"::h[0-9a-f]{16}$").expect("hash pattern is valid"))
}

/// Parse the text form of a `std::backtrace::Backtrace`.
pub fn parse_backtrace(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = re_location().captures(line) {
            if let Some(frame) = frames.last_mut() {
                frame.file = caps[1].to_string();
                frame.line = caps[2].parse().unwrap_or(0);
            }
        } else if let Some(caps) = re_symbol().captures(line) {
            let function = re_hash().replace(&caps[1], "").into_owned();
            frames.push(Frame::new("", 0, function));
        }
    }

    frames
}

/// The frame a log line is attributed to, and how far out it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub frame: Frame,
    pub depth: usize,
}

/// Walk the live stack from `location` outward, past `skip` frames, to the
/// first frame the rules don't ignore. Falls back to `location` itself.
pub fn resolve_caller(location: &Location<'_>, rules: &IgnoreRules, skip: usize) -> Caller {
    let trace = StackTrace::capture_from(location);
    trace
        .frames()
        .iter()
        .enumerate()
        .skip(skip)
        .find(|(_, frame)| !rules.is_ignored(frame))
        .map(|(depth, frame)| Caller {
            frame: frame.clone(),
            depth,
        })
        .unwrap_or_else(|| Caller {
            frame: Frame::from_location(location),
            depth: skip,
        })
}

/// Errors that carry the stack captured where they were created.
pub trait StackTracer {
    fn stack_trace(&self) -> &StackTrace;
}

/// The captured trace of `err`, if it is a [`TracedError`].
pub fn stack_trace_of<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a StackTrace> {
    err.downcast_ref::<TracedError>()
        .map(|traced| traced.stack_trace())
}

/// An error that remembers where it was created or wrapped.
///
/// # Example
///
/// ```
/// use logfan::core::TracedError;
///
/// let err = TracedError::new("config missing");
/// let wrapped = TracedError::wrap(err, "loading settings");
/// assert_eq!(wrapped.to_string(), "loading settings: config missing");
/// ```
pub struct TracedError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
    trace: StackTrace,
}

impl TracedError {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            trace: StackTrace::capture_from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn wrap<E>(err: E, message: impl Into<String>) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(err)),
            trace: StackTrace::capture_from(Location::caller()),
        }
    }

    pub fn with_trace(message: impl Into<String>, trace: StackTrace) -> Self {
        Self {
            message: message.into(),
            source: None,
            trace,
        }
    }
}

impl StackTracer for TracedError {
    fn stack_trace(&self) -> &StackTrace {
        &self.trace
    }
}

impl fmt::Display for TracedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => f.write_str(&self.message),
        }
    }
}

impl fmt::Debug for TracedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedError")
            .field("message", &self.message)
            .field("source", &self.source)
            .field("frames", &self.trace.len())
            .finish()
    }
}

impl Error for TracedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}
