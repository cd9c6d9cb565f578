//! Sink implementations

pub mod console;
pub mod memory;
pub mod writer;

pub use console::{StderrSink, StdoutSink};
pub use memory::MemorySink;
pub use writer::WriterSink;

// Re-export the trait for convenience
pub use crate::core::Sink;
