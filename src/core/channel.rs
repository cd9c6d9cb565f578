//! One severity channel: primary output plus fan-out sink set
//!
//! A channel writes each line synchronously to its primary output and hands
//! a copy to the dispatcher for its sink set. Lines starting with the
//! [`Arg::RawPrint`] marker are already decorated and go to the raw output
//! as they are.

use super::args::{render_args, Arg};
use super::config::LineFlags;
use super::dispatcher::{Delivery, Dispatcher};
use super::frames::Frame;
use super::multi_sink::MultiSink;
use super::sink::Sink;
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    Error,
    Status,
    Debug,
}

impl ChannelKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelKind::Error => "ERROR",
            ChannelKind::Status => "INFO",
            ChannelKind::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the last line of a channel was attributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribution {
    pub file: String,
    pub line: u32,
    pub function: String,
    /// Frames walked to find the caller
    pub depth: usize,
}

impl Attribution {
    pub fn set(&mut self, frame: &Frame, depth: usize) {
        self.file = frame.short_file().to_string();
        self.line = frame.line;
        self.function = frame.short_function().to_string();
        self.depth = depth;
    }
}

pub struct Channel {
    kind: ChannelKind,
    prefix: String,
    primary: Arc<dyn Sink>,
    raw: Arc<dyn Sink>,
    sinks: Arc<MultiSink>,
    flags: RwLock<LineFlags>,
    call_depth: AtomicUsize,
    attribution: Mutex<Attribution>,
    dispatcher: Arc<Dispatcher>,
}

impl Channel {
    pub fn new(
        kind: ChannelKind,
        primary: Arc<dyn Sink>,
        raw: Arc<dyn Sink>,
        dispatcher: Arc<Dispatcher>,
        flags: LineFlags,
        call_depth: usize,
    ) -> Self {
        Self {
            kind,
            prefix: format!("[[{}]]", kind.label()),
            primary,
            raw,
            sinks: Arc::new(MultiSink::default()),
            flags: RwLock::new(flags),
            call_depth: AtomicUsize::new(call_depth),
            attribution: Mutex::new(Attribution::default()),
            dispatcher,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// `[[LABEL]]`, written in front of every primary line.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn sinks(&self) -> &Arc<MultiSink> {
        &self.sinks
    }

    pub fn add_sinks(&self, sinks: &[Arc<dyn Sink>]) {
        self.sinks.append(sinks.iter().cloned());
    }

    pub fn delete_sinks(&self, sinks: &[Arc<dyn Sink>]) {
        self.sinks.remove(sinks);
    }

    pub fn flags(&self) -> LineFlags {
        *self.flags.read()
    }

    /// Swap the decoration flags, returning the previous ones.
    pub fn set_flags(&self, flags: LineFlags) -> LineFlags {
        std::mem::replace(&mut *self.flags.write(), flags)
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth.load(Ordering::Relaxed)
    }

    pub fn set_call_depth(&self, depth: usize) -> usize {
        self.call_depth.swap(depth, Ordering::Relaxed)
    }

    /// Lock the attribution state for the duration of one line.
    pub fn attribution(&self) -> MutexGuard<'_, Attribution> {
        self.attribution.lock()
    }

    pub fn last_attribution(&self) -> Attribution {
        self.attribution.lock().clone()
    }

    /// Render `args` and write the line, decorated with the caller's site.
    #[track_caller]
    pub fn printf(&self, args: &[Arg]) {
        self.emit(args, &Frame::from_location(Location::caller()));
    }

    /// Render `args` and write the line, decorated with `site`.
    pub fn emit(&self, args: &[Arg], site: &Frame) {
        let (raw, args) = match args.split_first() {
            Some((Arg::RawPrint(raw), rest)) => (*raw, rest),
            _ => (false, args),
        };
        self.emit_line(raw, &render_args(args), site);
    }

    /// Write an already rendered message.
    pub fn emit_line(&self, raw: bool, message: &str, site: &Frame) {
        let flags = self.flags();
        let time = flags.time_prefix();

        if raw {
            self.write_out(&self.raw, &format!("{}\n", message));
        } else {
            let location = if flags.short_file {
                format!("{}:{}: ", site.short_file(), site.line)
            } else {
                String::new()
            };
            let line = format!("{}{}{}{}\n", self.prefix, time, location, message);
            self.write_out(&self.primary, &line);
        }

        if self.sinks.is_empty() {
            return;
        }

        let payload = if raw {
            format!("{}\n", message)
        } else {
            format!("{}{}:{} {}\n", time, site.short_file(), site.line, message)
        };
        self.dispatch(payload);
    }

    fn dispatch(&self, payload: String) {
        let delivery = Delivery {
            sinks: Arc::clone(&self.sinks),
            payload,
            diagnostics: Arc::clone(&self.primary),
            prefix: self.prefix.clone(),
        };

        if let Err((err, delivery)) = self.dispatcher.dispatch(delivery) {
            delivery.report(&format!("write to sinks: {}", err));
        }
    }

    fn write_out(&self, out: &Arc<dyn Sink>, line: &str) {
        if let Err(e) = out.write_str(line) {
            eprintln!("[LOGGER ERROR] {} output '{}' failed: {}", self.kind, out.name(), e);
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("kind", &self.kind)
            .field("primary", &self.primary.name())
            .field("sinks", &self.sinks)
            .field("flags", &self.flags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::sinks::MemorySink;
    use std::time::Duration;

    struct Fixture {
        primary: Arc<MemorySink>,
        raw: Arc<MemorySink>,
        dispatcher: Arc<Dispatcher>,
        channel: Channel,
    }

    fn fixture(kind: ChannelKind) -> Fixture {
        let primary = Arc::new(MemorySink::new());
        let raw = Arc::new(MemorySink::new());
        let dispatcher = Arc::new(Dispatcher::new(16, 1));
        let channel = Channel::new(
            kind,
            primary.clone(),
            raw.clone(),
            dispatcher.clone(),
            LineFlags {
                time: false,
                short_file: true,
            },
            0,
        );
        Fixture {
            primary,
            raw,
            dispatcher,
            channel,
        }
    }

    #[test]
    fn test_primary_line_is_decorated() {
        let fx = fixture(ChannelKind::Status);
        let site = Frame::new("src/jobs/worker.rs", 12, "");

        fx.channel.emit(&args!["%d jobs", 3], &site);
        assert_eq!(fx.primary.contents(), "[[INFO]]worker.rs:12: 3 jobs\n");
        assert!(fx.raw.is_empty());
    }

    #[test]
    fn test_raw_marker_bypasses_primary() {
        let fx = fixture(ChannelKind::Error);
        let site = Frame::new("a.rs", 1, "");

        fx.channel
            .emit(&[Arg::RawPrint(true), Arg::from("already decorated")], &site);
        assert_eq!(fx.raw.contents(), "already decorated\n");
        assert!(fx.primary.is_empty());

        fx.channel.emit(&[Arg::RawPrint(false), Arg::from("plain")], &site);
        assert_eq!(fx.primary.contents(), "[[ERROR]]a.rs:1: plain\n");
    }

    #[test]
    fn test_sinks_receive_copy() {
        let fx = fixture(ChannelKind::Debug);
        let extra = Arc::new(MemorySink::new());
        fx.channel.add_sinks(&[extra.clone() as Arc<dyn Sink>]);

        fx.channel.emit(&args!["hello"], &Frame::new("x.rs", 7, ""));
        assert!(fx.dispatcher.wait_idle(Duration::from_secs(2)));
        assert_eq!(extra.contents(), "x.rs:7 hello\n");

        let extra_dyn: Arc<dyn Sink> = extra.clone();
        fx.channel.delete_sinks(&[extra_dyn]);
        assert!(fx.channel.sinks().is_empty());
    }

    #[test]
    fn test_printf_uses_call_site() {
        let fx = fixture(ChannelKind::Status);
        fx.channel.printf(&args!["here"]);
        assert!(fx.primary.contents().starts_with("[[INFO]]channel.rs:"));
    }

    #[test]
    fn test_flags_swap() {
        let fx = fixture(ChannelKind::Status);
        let old = fx.channel.set_flags(LineFlags::NONE);
        assert!(old.short_file);

        fx.channel.emit(&args!["bare"], &Frame::new("x.rs", 1, ""));
        assert_eq!(fx.primary.contents(), "[[INFO]]bare\n");
    }

    #[test]
    fn test_attribution_state() {
        let fx = fixture(ChannelKind::Error);
        fx.channel
            .attribution()
            .set(&Frame::new("/src/api/handlers.rs", 40, "app::api::handlers::create"), 3);

        let state = fx.channel.last_attribution();
        assert_eq!(state.file, "handlers.rs");
        assert_eq!(state.function, "handlers::create");
        assert_eq!(state.depth, 3);
    }
}
