//! Adapter turning any `io::Write` into a sink

use crate::core::Sink;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Wraps a writer behind a mutex so it can be shared between channels.
///
/// Every write is flushed, so a buffered file sees whole lines.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
    name: String,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W, name: impl Into<String>) -> Self {
        Self {
            writer: Mutex::new(writer),
            name: name.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterSink<BufWriter<File>> {
    /// Append to the file at `path`, creating it if needed.
    pub fn append_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file), path.display().to_string()))
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut writer = self.writer.lock();
        let n = writer.write(buf)?;
        writer.flush()?;
        Ok(n)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
