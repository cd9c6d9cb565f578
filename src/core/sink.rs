//! Sink trait for byte-oriented log destinations

use super::multi_sink::MultiSink;
use std::io;
use std::sync::Arc;

/// A destination that accepts rendered log bytes.
///
/// Sinks are shared as `Arc<dyn Sink>` and compared by identity, so the same
/// `Arc` registered twice is the same sink. Return [`poison_error`] to ask the
/// registry to drop the sink for good.
///
/// [`poison_error`]: crate::core::poison_error
pub trait Sink: Send + Sync {
    /// Write `buf`, returning how many bytes were consumed.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// String fast path. Defaults to the byte path.
    fn write_str(&self, s: &str) -> io::Result<usize> {
        self.write(s.as_bytes())
    }

    fn name(&self) -> &str {
        "sink"
    }

    /// Registries expose themselves here so composition can flatten them.
    fn as_multi(&self) -> Option<&MultiSink> {
        None
    }
}

/// Identity comparison of two shared sinks.
///
/// Only the data pointer is compared; vtable pointers of the same type may
/// differ between codegen units.
#[inline]
pub fn same_sink(a: &Arc<dyn Sink>, b: &Arc<dyn Sink>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
