//! Logger configuration
//!
//! Toggles and decoration settings for the three channels. Parsing of
//! command-line flags is left to the application; this is the deserialised
//! form it hands over.

use super::error::{LoggerError, Result};
use super::frames::IgnoreRules;
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Default capacity of the fan-out dispatch queue.
pub const DEFAULT_DISPATCH_QUEUE: usize = 1024;

/// Default number of fan-out worker threads.
pub const DEFAULT_DISPATCH_WORKERS: usize = 2;

/// Decoration applied to lines written through a channel's primary output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFlags {
    /// Prefix lines with `HH:MM:SS `
    pub time: bool,
    /// Prefix lines with `file.rs:line: `
    pub short_file: bool,
}

impl Default for LineFlags {
    fn default() -> Self {
        Self {
            time: true,
            short_file: true,
        }
    }
}

impl LineFlags {
    pub const NONE: LineFlags = LineFlags {
        time: false,
        short_file: false,
    };

    /// `HH:MM:SS ` in local time, or nothing when the time flag is off.
    pub fn time_prefix(&self) -> String {
        if self.time {
            Local::now().format("%H:%M:%S ").to_string()
        } else {
            String::new()
        }
    }
}

/// Configuration for [`Loggers`](crate::core::Loggers).
///
/// # Example
///
/// ```
/// use logfan::core::LoggerConfig;
///
/// let config = LoggerConfig::from_json_str(r#"{ "debug": true }"#).unwrap();
/// assert!(config.debug);
/// assert!(config.status);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Debug channel enabled
    pub debug: bool,
    /// Status channel enabled
    pub status: bool,
    pub line_flags: LineFlags,
    pub ignore: IgnoreRules,
    /// Frames skipped before attribution starts on the error channel
    pub error_call_depth: usize,
    /// Frames skipped at the top of live stack dumps
    pub stack_begin_with: usize,
    /// Capacity of the bounded fan-out queue
    pub dispatch_queue: usize,
    pub dispatch_workers: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            status: true,
            line_flags: LineFlags::default(),
            ignore: IgnoreRules::default(),
            error_call_depth: 0,
            stack_begin_with: 0,
            dispatch_queue: DEFAULT_DISPATCH_QUEUE,
            dispatch_workers: DEFAULT_DISPATCH_WORKERS,
        }
    }
}

impl LoggerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LoggerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dispatch_queue == 0 {
            return Err(LoggerError::config(
                "dispatch_queue",
                "capacity must be at least 1",
            ));
        }
        if self.dispatch_workers == 0 {
            return Err(LoggerError::config(
                "dispatch_workers",
                "at least one worker is required",
            ));
        }
        Ok(())
    }
}
