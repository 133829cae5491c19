//! # Backflow
//!
//! Backpressure-aware output buffering for non-blocking sinks driven by a
//! readiness-notification loop.
//!
//! ## Architecture
//!
//! - **`backflow-core`**: the write buffer state machine, sink and loop traits
//! - **`backflow`**: Public API surface (this crate)
//!
//! A [`WriteBuffer`] accepts writes at any time, subscribes to write-readiness
//! only while it holds unsent bytes, and flushes whenever the loop reports the
//! sink writable. Producers learn about backpressure from the return value of
//! `write` and from [`BufferEvent::Drain`] on the buffer's monitor.
//!
//! ## Quick Start
//!
//! ```rust
//! use backflow::prelude::*;
//! use std::rc::Rc;
//!
//! let lp = Rc::new(ReadyLoop::new());
//! let mut buf = WriteBuffer::new(MemorySink::new(), Rc::clone(&lp));
//! let events = buf.monitor();
//!
//! buf.write("hello ");
//! buf.end_with("world");
//!
//! backflow::drive(&lp, &mut buf, 16);
//!
//! assert_eq!(buf.sink().written(), b"hello world");
//! assert_eq!(events.try_recv().unwrap(), BufferEvent::Close(buf.id()));
//! ```
//!
//! ## Real sockets
//!
//! [`IoSink`] wraps any non-blocking `std::io::Write`. `WouldBlock` counts as
//! "nothing accepted", so the remainder simply waits for the next readiness
//! notification.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dev_tracing;
mod driver;

pub use driver::drive;

// Re-export core types
pub use backflow_core::error::{BufferError, Diagnostic, Result, SinkError, WriteError};
pub use backflow_core::event_loop::{EventLoop, ReadyLoop};
pub use backflow_core::monitor::{
    create_monitor, BufferEvent, BufferEventSender, BufferId, BufferMonitor,
};
pub use backflow_core::options::{BufferOptions, DEFAULT_SOFT_LIMIT};
pub use backflow_core::sink::{IoSink, MemorySink, Sink};
pub use backflow_core::write_buffer::{BufferState, WriteBuffer};
pub use bytes::Bytes;

/// Commonly used types.
pub mod prelude {
    pub use backflow_core::prelude::*;
}
