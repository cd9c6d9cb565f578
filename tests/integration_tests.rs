//! Integration tests for logfan
//!
//! Channels, fan-out sinks and the self-healing registry working together.

use logfan::core::{is_poison, poison_error, ChannelKind, Frame, StackTrace};
use logfan::prelude::*;
use logfan::sinks::MemorySink;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Accepts a fixed number of writes, then reports itself broken.
struct Expiring {
    remaining: AtomicUsize,
    written: AtomicUsize,
}

impl Expiring {
    fn new(writes: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(writes),
            written: AtomicUsize::new(0),
        }
    }
}

impl Sink for Expiring {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let left = self.remaining.load(Ordering::SeqCst);
        if left == 0 {
            return Err(poison_error());
        }
        self.remaining.store(left - 1, Ordering::SeqCst);
        self.written.fetch_add(1, Ordering::SeqCst);
        Ok(buf.len())
    }

    fn name(&self) -> &str {
        "expiring"
    }
}

fn quiet_loggers(primary: Arc<MemorySink>) -> Loggers {
    Loggers::builder()
        .primary(primary)
        .line_flags(LineFlags::NONE)
        .debug(true)
        .build()
        .expect("Failed to build loggers")
}

#[test]
fn test_lines_fan_out_to_every_selected_sink() {
    let primary = Arc::new(MemorySink::new());
    let loggers = quiet_loggers(primary.clone());

    let everything = Arc::new(MemorySink::named("everything"));
    let errors = Arc::new(MemorySink::named("errors"));
    loggers.set_writers(&[everything.clone() as Arc<dyn Sink>], &[ChannelSelector::All]);
    loggers.set_writers(&[errors.clone() as Arc<dyn Sink>], &[ChannelSelector::ErrorOnly]);

    loggers.status_log(&logfan::args!["service up"]);
    loggers.debug_log(&logfan::args!["pool=%d", 4]);
    loggers.error_log(&io::Error::new(io::ErrorKind::Other, "db timeout"), &[]);
    assert!(loggers.wait_idle(Duration::from_secs(2)));

    let all = everything.lines();
    assert_eq!(all.len(), 3);
    assert!(all.iter().any(|l| l.ends_with("service up")));
    assert!(all.iter().any(|l| l.ends_with("pool=4")));
    assert!(all.iter().any(|l| l.ends_with("db timeout")));

    assert_eq!(errors.lines().len(), 1);
    assert!(errors.contents().contains("db timeout"));
    assert_eq!(primary.lines().len(), 3);
}

#[test]
fn test_poisoned_sink_leaves_channel() {
    let primary = Arc::new(MemorySink::new());
    let loggers = quiet_loggers(primary.clone());
    let expiring = Arc::new(Expiring::new(2));
    let healthy = Arc::new(MemorySink::new());
    loggers.set_writers(
        &[expiring.clone() as Arc<dyn Sink>, healthy.clone() as Arc<dyn Sink>],
        &[ChannelSelector::StatusOnly],
    );

    for i in 0..5 {
        loggers.status_log(&logfan::args!["tick %d", i]);
        assert!(loggers.wait_idle(Duration::from_secs(2)));
    }

    let status = loggers.channel(ChannelKind::Status);
    assert_eq!(status.sinks().len(), 1);
    assert_eq!(expiring.written.load(Ordering::SeqCst), 2);
    assert_eq!(healthy.lines().len(), 5);

    // the broadcast that hit the poison was reported once on the primary
    let reports: Vec<String> = primary
        .lines()
        .into_iter()
        .filter(|l| l.contains("write to sinks:"))
        .collect();
    assert_eq!(reports.len(), 1, "{:?}", reports);
    assert!(reports[0].starts_with("[[INFO]]write to sinks: MultiSinkError"));
}

#[test]
fn test_registry_reports_all_failures() {
    let failing: Vec<Arc<dyn Sink>> = (0..3).map(|_| Arc::new(Expiring::new(0)) as Arc<dyn Sink>).collect();
    let registry = MultiSink::new(failing);

    let err = registry.write(b"payload").unwrap_err();
    assert_eq!(err.accepted, 7);
    assert_eq!(err.len(), 3);
    assert!(err.failures.iter().all(|f| is_poison(&f.error)));

    // one self-heal per broadcast
    assert_eq!(registry.len(), 2);
    let _ = registry.write(b"payload");
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_file_sink_receives_error_stack() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("errors.log");
    let primary = Arc::new(MemorySink::new());
    let loggers = quiet_loggers(primary.clone());

    let file_sink = Arc::new(WriterSink::append_file(&log_file).expect("Failed to open log file"));
    loggers.set_writers(&[file_sink as Arc<dyn Sink>], &[ChannelSelector::ErrorOnly]);

    let trace = StackTrace::from_frames(vec![
        Frame::new("/srv/app/src/orders.rs", 88, "app::orders::checkout"),
        Frame::new("/srv/app/src/main.rs", 10, "app::main"),
    ]);
    let err = TracedError::with_trace("payment declined", trace);
    loggers.error_stack(&err, &logfan::args!["order %d", 17]);
    assert!(loggers.wait_idle(Duration::from_secs(2)));

    let content = std::fs::read_to_string(&log_file).expect("Failed to read log file");
    assert_eq!(
        content,
        "[[ERR_STACK]]payment declined,order 17\n\
         orders.rs:88 [[ERR_STACK]] orders::checkout()\n\
         main.rs:10 [[ERR_STACK]] app::main()\n"
    );
}

#[test]
fn test_deleted_writer_gets_nothing_more() {
    let primary = Arc::new(MemorySink::new());
    let loggers = quiet_loggers(primary);
    let sink = Arc::new(MemorySink::new());
    let as_dyn: Arc<dyn Sink> = sink.clone();

    loggers.set_writers(&[as_dyn.clone()], &[ChannelSelector::All]);
    loggers.status_log(&logfan::args!["first"]);
    assert!(loggers.wait_idle(Duration::from_secs(2)));

    loggers.delete_writers(&[as_dyn], &[ChannelSelector::All]);
    loggers.status_log(&logfan::args!["second"]);
    assert!(loggers.wait_idle(Duration::from_secs(2)));

    assert_eq!(sink.lines().len(), 1);
    assert!(sink.contents().contains("first"));
}

#[test]
fn test_muted_channels_never_reach_sinks() {
    let primary = Arc::new(MemorySink::new());
    let loggers = quiet_loggers(primary.clone());
    let sink = Arc::new(MemorySink::new());
    loggers.set_writers(&[sink.clone() as Arc<dyn Sink>], &[ChannelSelector::All]);

    assert!(loggers.set_status(false));
    assert!(loggers.set_debug(false));
    loggers.status_log(&logfan::args!["status %s", "muted"]);
    loggers.debug_log(&logfan::args!["debug %s", "muted"]);
    logfan::status_log!(loggers; "macro status");
    logfan::debug_log!(loggers; "macro debug");
    assert!(loggers.wait_idle(Duration::from_secs(2)));

    assert!(sink.is_empty());
    assert!(primary.is_empty());

    assert!(!loggers.set_status(true));
    loggers.status_log(&logfan::args!["back"]);
    assert!(loggers.wait_idle(Duration::from_secs(2)));
    assert_eq!(sink.lines(), ["[[INFO]]back"]);
}

#[test]
fn test_config_from_json_drives_channels() {
    let config = LoggerConfig::from_json_str(
        r#"{ "debug": false, "status": true, "line_flags": { "time": false, "short_file": false } }"#,
    )
    .expect("Failed to parse config");

    let primary = Arc::new(MemorySink::new());
    let loggers = Loggers::builder()
        .config(config)
        .primary(primary.clone())
        .build()
        .expect("Failed to build loggers");

    loggers.debug_log(&logfan::args!["invisible"]);
    loggers.status_log(&logfan::args!["visible"]);
    assert_eq!(primary.contents(), "[[INFO]]visible\n");
}

#[test]
fn test_global_init_once() {
    let primary = Arc::new(MemorySink::new());
    logfan::init(quiet_loggers(primary.clone())).expect("Failed to install loggers");

    let again = logfan::init(Loggers::default());
    assert!(matches!(again, Err(LoggerError::AlreadyInitialized)));

    logfan::status_log(&logfan::args!["via global"]);
    logfan::status_log!("via %s", "macro");
    assert_eq!(primary.lines(), ["[[INFO]]via global", "[[INFO]]via macro"]);

    assert!(logfan::set_debug(false));
    assert!(logfan::set_status(false));
    logfan::status_log(&logfan::args!["muted"]);
    assert_eq!(primary.lines().len(), 2);
}
