//! Background fan-out of rendered lines to a channel's sinks
//!
//! `Channel::printf` hands each line to the dispatcher and returns at once.
//! Worker threads pull deliveries from a bounded queue and broadcast them;
//! broadcast errors and panics raised by sinks are caught per delivery and
//! reported on the channel's primary output, never to the logging caller.

use super::error::{LoggerError, Result};
use super::multi_sink::MultiSink;
use super::sink::Sink;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default shutdown timeout for draining pending deliveries (5 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// One line bound for a sink set.
pub struct Delivery {
    pub sinks: Arc<MultiSink>,
    pub payload: String,
    /// Where failures of this delivery are reported
    pub diagnostics: Arc<dyn Sink>,
    /// Prefix of the diagnostic lines, e.g. `[[ERROR]]`
    pub prefix: String,
}

impl Delivery {
    fn run(self) {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.broadcast()));

        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => self.report(&format!("write to sinks: {}", err)),
            Err(panic) => self.report(&format!("recover: {}", panic_message(panic.as_ref()))),
        }
    }

    fn broadcast(&self) -> Result<usize> {
        Ok(self.sinks.write_str(&self.payload)?)
    }

    pub(crate) fn report(&self, message: &str) {
        let line = format!("{}{}\n", self.prefix, message);
        if let Err(e) = self.diagnostics.write_str(&line) {
            eprintln!("[LOGGER ERROR] {} (diagnostics unavailable: {})", message, e);
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

pub struct Dispatcher {
    sender: Option<Sender<Delivery>>,
    workers: Vec<thread::JoinHandle<()>>,
    pending: Arc<AtomicUsize>,
    capacity: usize,
}

impl Dispatcher {
    /// Start `workers` threads draining a queue of `capacity` deliveries.
    ///
    /// Both counts are raised to 1. If no worker thread can be spawned the
    /// dispatcher starts stopped and every dispatch is rejected.
    pub fn new(capacity: usize, workers: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        let pending = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(workers.max(1));
        for idx in 0..workers.max(1) {
            let receiver: Receiver<Delivery> = receiver.clone();
            let pending = Arc::clone(&pending);
            let spawned = thread::Builder::new()
                .name(format!("logfan-dispatch-{}", idx))
                .spawn(move || {
                    for delivery in receiver.iter() {
                        delivery.run();
                        pending.fetch_sub(1, Ordering::AcqRel);
                    }
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    let err = LoggerError::io_operation("spawning dispatch worker", "thread spawn failed", e);
                    eprintln!("[LOGGER ERROR] {}", err);
                    break;
                }
            }
        }

        let sender = if handles.is_empty() { None } else { Some(sender) };

        Self {
            sender,
            workers: handles,
            pending,
            capacity,
        }
    }

    /// Worker threads started.
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Queue `delivery` without blocking.
    ///
    /// A full queue hands the delivery back inside the error so the caller
    /// can report the drop.
    pub fn dispatch(&self, delivery: Delivery) -> std::result::Result<(), (LoggerError, Delivery)> {
        let Some(sender) = self.sender.as_ref() else {
            return Err((LoggerError::DispatcherStopped, delivery));
        };

        self.pending.fetch_add(1, Ordering::AcqRel);
        match sender.try_send(delivery) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(delivery)) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                Err((
                    LoggerError::QueueFull {
                        capacity: self.capacity,
                    },
                    delivery,
                ))
            }
            Err(TrySendError::Disconnected(delivery)) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                Err((LoggerError::DispatcherStopped, delivery))
            }
        }
    }

    /// Deliveries queued or in flight.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait until every queued delivery has been broadcast.
    ///
    /// Returns `false` if `timeout` expired first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.pending() > 0 {
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Stop accepting deliveries, drain the queue and join the workers.
    ///
    /// Returns `true` if every worker finished within `timeout`.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        // Closing the channel lets the workers drain and exit
        drop(self.sender.take());

        let start = Instant::now();
        let mut clean = true;
        for handle in self.workers.drain(..) {
            loop {
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        eprintln!("[LOGGER ERROR] Dispatch worker panicked during shutdown: {:?}", e);
                        clean = false;
                    }
                    break;
                }

                if start.elapsed() >= timeout {
                    eprintln!(
                        "[LOGGER WARNING] Dispatch worker did not finish within {:?}. \
                         Some deliveries may be lost.",
                        timeout
                    );
                    clean = false;
                    break;
                }

                thread::sleep(Duration::from_millis(10));
            }
        }

        clean
    }

    pub fn is_running(&self) -> bool {
        self.sender.is_some()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if self.is_running() {
            self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        }
    }
}
