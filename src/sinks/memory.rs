//! In-memory sink that keeps everything written to it

use crate::core::Sink;
use parking_lot::Mutex;
use std::io;

/// Collects written bytes. Handy for tests and for buffering a session.
///
/// # Example
///
/// ```
/// use logfan::core::Sink;
/// use logfan::sinks::MemorySink;
///
/// let sink = MemorySink::new();
/// sink.write_str("a\nb\n").unwrap();
/// assert_eq!(sink.lines(), ["a", "b"]);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: Mutex<Vec<u8>>,
    name: String,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            buf: Mutex::new(Vec::new()),
            name: name.into(),
        }
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(String::from).collect()
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }

    pub fn clear(&self) {
        self.buf.lock().clear();
    }
}

impl Sink for MemorySink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_writes() {
        let sink = MemorySink::named("capture");
        sink.write(b"one\n").unwrap();
        sink.write_str("two\n").unwrap();

        assert_eq!(sink.contents(), "one\ntwo\n");
        assert_eq!(sink.lines(), ["one", "two"]);
        assert_eq!(sink.name(), "capture");

        sink.clear();
        assert!(sink.is_empty());
    }
}
