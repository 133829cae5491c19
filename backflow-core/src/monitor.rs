//! Write buffer event monitoring.
//!
//! Buffers publish their lifecycle events on a channel instead of invoking
//! callbacks, so a consumer can react (write more, `end`, `close`) without
//! re-entering the buffer that emitted the event.

use crate::error::WriteError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a write buffer.
///
/// Carried by every event so several buffers can share one monitor, and used
/// as the registration key with the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    pub(crate) fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// Write buffer lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferEvent {
    /// A flush brought the queue from at or above the soft limit to below it.
    Drain(BufferId),

    /// The buffer terminated and its queue was discarded.
    Close(BufferId),

    /// A flush attempt failed. The queue is unchanged.
    Error { buffer: BufferId, error: WriteError },
}

impl BufferEvent {
    /// The buffer that emitted this event.
    #[must_use]
    pub const fn buffer(&self) -> BufferId {
        match self {
            Self::Drain(id) | Self::Close(id) => *id,
            Self::Error { buffer, .. } => *buffer,
        }
    }
}

impl fmt::Display for BufferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drain(id) => write!(f, "{id} drained below soft limit"),
            Self::Close(id) => write!(f, "{id} closed"),
            Self::Error { buffer, error } => write!(f, "{buffer} error: {error}"),
        }
    }
}

/// Handle for receiving buffer events.
pub type BufferMonitor = flume::Receiver<BufferEvent>;

/// Sender side of a buffer monitor.
///
/// Clone it into several buffers to collect their events on one receiver.
pub type BufferEventSender = flume::Sender<BufferEvent>;

/// Creates a new monitoring channel pair.
#[must_use]
pub fn create_monitor() -> (BufferEventSender, BufferMonitor) {
    flume::unbounded()
}
