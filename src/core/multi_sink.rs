//! Broadcast registry that fans one payload out to many sinks
//!
//! Writes take the shared lock so concurrent broadcasts run in parallel;
//! `append`/`remove` take the exclusive lock. A sink answering with the
//! poison error is pruned once the shared lock of that broadcast is released.

use super::error::{short_write, MultiSinkError, SinkFailure};
use super::sink::{same_sink, Sink};
use parking_lot::RwLock;
use std::fmt;
use std::io;
use std::sync::Arc;

#[derive(Default)]
pub struct MultiSink {
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
}

impl MultiSink {
    /// Build a registry from `sinks`, flattening any registry among them into
    /// its member sinks.
    ///
    /// # Example
    ///
    /// ```
    /// use logfan::core::{MultiSink, Sink};
    /// use logfan::sinks::MemorySink;
    /// use std::sync::Arc;
    ///
    /// let a: Arc<dyn Sink> = Arc::new(MemorySink::new());
    /// let inner: Arc<dyn Sink> = Arc::new(MultiSink::new([a.clone(), a.clone()]));
    /// let outer = MultiSink::new([inner, a]);
    /// assert_eq!(outer.len(), 3);
    /// ```
    pub fn new(sinks: impl IntoIterator<Item = Arc<dyn Sink>>) -> Self {
        let registry = Self::default();
        registry.append_flattened(sinks);
        registry
    }

    /// Add sinks at the end of the set. A registry is added as one sink.
    pub fn append(&self, sinks: impl IntoIterator<Item = Arc<dyn Sink>>) {
        let mut guard = self.sinks.write();
        guard.extend(sinks);
    }

    /// Add sinks at the end of the set, splicing in the members of any
    /// registry instead of the registry itself.
    pub fn append_flattened(&self, sinks: impl IntoIterator<Item = Arc<dyn Sink>>) {
        // Snapshot nested members before locking our own set; a registry
        // appended to itself would otherwise deadlock.
        let mut flat = Vec::new();
        for sink in sinks {
            match sink.as_multi() {
                Some(multi) => flat.extend(multi.sinks()),
                None => flat.push(sink),
            }
        }

        self.sinks.write().extend(flat);
    }

    /// Remove every occurrence of every given sink.
    pub fn remove(&self, sinks: &[Arc<dyn Sink>]) {
        let mut guard = self.sinks.write();
        guard.retain(|registered| !sinks.iter().any(|gone| same_sink(registered, gone)));
    }

    /// Broadcast `buf` to every sink in set order.
    ///
    /// Returns `buf.len()` when every sink took the whole payload, otherwise a
    /// [`MultiSinkError`] with one record per failed sink. Delivery to the
    /// remaining sinks is never cut short.
    pub fn write(&self, buf: &[u8]) -> Result<usize, MultiSinkError> {
        self.broadcast(buf.len(), |sink| sink.write(buf))
    }

    /// Same as [`MultiSink::write`], using each sink's string fast path.
    pub fn write_str(&self, s: &str) -> Result<usize, MultiSinkError> {
        self.broadcast(s.len(), |sink| sink.write_str(s))
    }

    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }

    /// Snapshot of the current sink set.
    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        self.sinks.read().clone()
    }

    pub fn contains(&self, sink: &Arc<dyn Sink>) -> bool {
        self.sinks.read().iter().any(|s| same_sink(s, sink))
    }

    fn broadcast<F>(&self, len: usize, mut write: F) -> Result<usize, MultiSinkError>
    where
        F: FnMut(&dyn Sink) -> io::Result<usize>,
    {
        if len == 0 {
            return Ok(0);
        }

        let failures = {
            let sinks = self.sinks.read();
            let mut failures = Vec::new();
            for sink in sinks.iter() {
                match write(sink.as_ref()) {
                    Ok(n) if n == len => {}
                    Ok(n) => failures.push(SinkFailure {
                        sink: Arc::clone(sink),
                        error: short_write(len, n),
                    }),
                    Err(error) => failures.push(SinkFailure {
                        sink: Arc::clone(sink),
                        error,
                    }),
                }
            }
            failures
        };

        if failures.is_empty() {
            return Ok(len);
        }

        // At most one self-heal per broadcast.
        if let Some(poisoned) = failures.iter().find(|failure| failure.is_poison()) {
            self.remove(std::slice::from_ref(&poisoned.sink));
        }

        Err(MultiSinkError {
            accepted: len,
            failures,
        })
    }
}

impl Sink for MultiSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        MultiSink::write(self, buf).map_err(io::Error::from)
    }

    fn write_str(&self, s: &str) -> io::Result<usize> {
        MultiSink::write_str(self, s).map_err(io::Error::from)
    }

    fn name(&self) -> &str {
        "multi_sink"
    }

    fn as_multi(&self) -> Option<&MultiSink> {
        Some(self)
    }
}

impl fmt::Debug for MultiSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sinks = self.sinks.read();
        f.debug_list()
            .entries(sinks.iter().map(|sink| sink.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::poison_error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        writes: AtomicUsize,
    }

    impl Sink for Counting {
        fn write(&self, buf: &[u8]) -> io::Result<usize> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(buf.len())
        }
    }

    struct Failing;

    impl Sink for Failing {
        fn write(&self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("transient failure"))
        }
    }

    struct Broken;

    impl Sink for Broken {
        fn write(&self, _buf: &[u8]) -> io::Result<usize> {
            Err(poison_error())
        }
    }

    struct Short;

    impl Sink for Short {
        fn write(&self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len() / 2)
        }
    }

    fn counting() -> (Arc<Counting>, Arc<dyn Sink>) {
        let concrete = Arc::new(Counting::default());
        let shared: Arc<dyn Sink> = concrete.clone();
        (concrete, shared)
    }

    #[test]
    fn test_broadcast_reaches_every_sink() {
        let (a, a_dyn) = counting();
        let (b, b_dyn) = counting();
        let multi = MultiSink::new([a_dyn.clone(), a_dyn, b_dyn]);

        assert_eq!(multi.write(b"Hello ").unwrap(), 6);
        assert_eq!(a.writes.load(Ordering::SeqCst), 2);
        assert_eq!(b.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_failures_are_collected() {
        let failing: Arc<dyn Sink> = Arc::new(Failing);
        let multi = MultiSink::new([failing.clone(), failing.clone(), failing]);

        let err = multi.write(b"payload").unwrap_err();
        assert_eq!(err.len(), 3);
        assert_eq!(err.accepted, 7);
        // transient failures keep the sinks
        assert_eq!(multi.len(), 3);
    }

    #[test]
    fn test_poisoned_sink_is_removed_after_one_broadcast() {
        let (good, good_dyn) = counting();
        let broken: Arc<dyn Sink> = Arc::new(Broken);
        let multi = MultiSink::new([good_dyn, broken.clone()]);

        let err = multi.write(b"first").unwrap_err();
        assert!(err.has_poison());
        assert!(!multi.contains(&broken));

        assert_eq!(multi.write(b"second").unwrap(), 6);
        assert_eq!(good.writes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_one_removal_per_broadcast() {
        let first: Arc<dyn Sink> = Arc::new(Broken);
        let second: Arc<dyn Sink> = Arc::new(Broken);
        let multi = MultiSink::new([first.clone(), second.clone()]);

        let err = multi.write(b"x").unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(!multi.contains(&first));
        assert!(multi.contains(&second));

        let _ = multi.write(b"x");
        assert!(multi.is_empty());
    }

    #[test]
    fn test_poisoned_duplicates_go_together() {
        let broken: Arc<dyn Sink> = Arc::new(Broken);
        let multi = MultiSink::new([broken.clone(), broken.clone()]);

        let err = multi.write(b"x").unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(multi.is_empty());
    }

    #[test]
    fn test_short_write_is_a_failure() {
        let short: Arc<dyn Sink> = Arc::new(Short);
        let multi = MultiSink::new([short]);

        let err = multi.write(b"four").unwrap_err();
        assert_eq!(err.failures[0].error.kind(), io::ErrorKind::WriteZero);
        assert_eq!(multi.len(), 1);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let (_, a) = counting();
        let (_, b) = counting();
        let (_, absent) = counting();
        let multi = MultiSink::new([a.clone(), b.clone(), b.clone()]);

        multi.remove(&[absent]);
        assert_eq!(multi.len(), 3);

        multi.remove(&[b.clone()]);
        assert_eq!(multi.len(), 1);
        assert!(multi.contains(&a));
        assert!(!multi.contains(&b));
    }

    #[test]
    fn test_composition_flattens() {
        let (_, a) = counting();
        let inner: Arc<dyn Sink> = Arc::new(MultiSink::new([a.clone(), a.clone()]));
        let outer = MultiSink::new([inner, a.clone()]);

        let sinks = outer.sinks();
        assert_eq!(sinks.len(), 3);
        assert!(sinks.iter().all(|s| same_sink(s, &a)));
    }

    #[test]
    fn test_append_keeps_registry_whole() {
        let (_, a) = counting();
        let inner: Arc<dyn Sink> = Arc::new(MultiSink::new([a.clone(), a]));
        let outer = MultiSink::default();

        outer.append([inner.clone()]);
        assert_eq!(outer.len(), 1);

        outer.append_flattened([inner]);
        assert_eq!(outer.len(), 3);
    }

    #[test]
    fn test_write_str_heals_too() {
        let broken: Arc<dyn Sink> = Arc::new(Broken);
        let multi = MultiSink::new([broken]);

        assert!(multi.write_str("line").is_err());
        assert!(multi.is_empty());
        assert_eq!(multi.write_str("line").unwrap(), 4);
    }

    #[test]
    fn test_empty_payload_skips_sinks() {
        let (a, a_dyn) = counting();
        let multi = MultiSink::new([a_dyn]);

        assert_eq!(multi.write(b"").unwrap(), 0);
        assert_eq!(a.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_error_display_lists_sinks() {
        let failing: Arc<dyn Sink> = Arc::new(Failing);
        let multi = MultiSink::new([failing.clone(), failing]);

        let text = multi.write(b"x").unwrap_err().to_string();
        assert!(text.starts_with("MultiSinkError: transient failure, sink: sink"));
        assert_eq!(text.lines().count(), 2);
    }
}
