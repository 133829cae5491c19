//! Backflow Core
//!
//! This crate contains the write buffer and the pieces it is built from:
//! - FIFO byte queue of `Bytes` segments (`buffer`)
//! - Non-blocking sink capability and adapters (`sink`)
//! - Write-readiness subscription (`event_loop`)
//! - Buffer lifecycle events (`monitor`)
//! - Buffer configuration (`options`)
//! - The backpressure-aware buffer state machine (`write_buffer`)
//! - Error types (`error`)

#![deny(unsafe_code)]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
pub mod buffer;
pub mod error;
pub mod event_loop;
pub mod monitor;
pub mod options;
pub mod sink;
pub mod write_buffer;

// Optional: a small prelude to make downstream crates ergonomic.
// Keep it minimal to avoid API lock-in.
pub mod prelude {
    pub use crate::buffer::SegmentedBuffer;
    pub use crate::error::{BufferError, Diagnostic, SinkError, WriteError};
    pub use crate::event_loop::{EventLoop, ReadyLoop};
    pub use crate::monitor::{BufferEvent, BufferEventSender, BufferId, BufferMonitor};
    pub use crate::options::BufferOptions;
    pub use crate::sink::{IoSink, MemorySink, Sink};
    pub use crate::write_buffer::{BufferState, WriteBuffer};
}
