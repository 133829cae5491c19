//! Backpressure-aware write buffer.
//!
//! A [`WriteBuffer`] queues bytes for a non-blocking [`Sink`], subscribes to
//! write-readiness only while it has something to send, and flushes
//! opportunistically whenever the loop reports the sink writable.
//!
//! ```text
//!                           write()
//!   Open{listening: false} ─────────► Open{listening: true}
//!            ▲                                 │
//!            └────── queue fully drained ──────┘
//!
//!   Open{listening: false} ── end() | close() ──► Closed
//!   Open{listening: true}  ── close() ──────────► Closed
//!   Open{listening: true}  ── end() ──► Ending ── drained | close() ──► Closed
//! ```
//!
//! Flush outcomes are never returned to the caller; they are published on the
//! buffer's monitor channel as [`BufferEvent`]s.

use crate::buffer::SegmentedBuffer;
use crate::error::{Result, WriteError};
use crate::event_loop::EventLoop;
use crate::monitor::{create_monitor, BufferEvent, BufferEventSender, BufferId, BufferMonitor};
use crate::options::{validate_soft_limit, BufferOptions, DEFAULT_SOFT_LIMIT};
use crate::sink::Sink;
use bytes::Bytes;
use tracing::{debug, trace, warn};

/// Lifecycle state of a [`WriteBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Accepting writes. `listening` is true while subscribed to write-readiness.
    Open { listening: bool },
    /// `end()` was called with data still queued; subscribed until it drains.
    Ending,
    /// Terminal. Queue discarded, unsubscribed.
    Closed,
}

impl BufferState {
    #[must_use]
    pub const fn is_listening(self) -> bool {
        matches!(self, Self::Open { listening: true } | Self::Ending)
    }
}

/// Output queue between a producer and a non-blocking sink.
///
/// # Example
///
/// ```
/// use backflow_core::prelude::*;
/// use std::rc::Rc;
///
/// let lp = Rc::new(ReadyLoop::new());
/// let opts = BufferOptions::new().with_soft_limit(10);
/// let mut buf = WriteBuffer::with_options(MemorySink::new(), Rc::clone(&lp), opts).unwrap();
/// let events = buf.monitor();
///
/// assert!(!buf.write("12345678901234"));
/// assert!(lp.is_registered(buf.id()));
///
/// lp.dispatch(&mut buf);
/// assert!(buf.is_empty());
/// assert!(!buf.is_listening());
/// assert_eq!(events.try_recv().unwrap(), BufferEvent::Drain(buf.id()));
/// ```
#[derive(Debug)]
pub struct WriteBuffer<S, L>
where
    S: Sink,
    L: EventLoop<S>,
{
    id: BufferId,
    sink: S,
    event_loop: L,
    queue: SegmentedBuffer,
    soft_limit: usize,
    state: BufferState,
    events: Option<BufferEventSender>,
}

impl<S, L> WriteBuffer<S, L>
where
    S: Sink,
    L: EventLoop<S>,
{
    /// Create a buffer with the default soft limit.
    pub fn new(sink: S, event_loop: L) -> Self {
        Self {
            id: BufferId::next(),
            sink,
            event_loop,
            queue: SegmentedBuffer::new(),
            soft_limit: DEFAULT_SOFT_LIMIT,
            state: BufferState::Open { listening: false },
            events: None,
        }
    }

    /// Create a buffer with explicit options.
    pub fn with_options(sink: S, event_loop: L, options: BufferOptions) -> Result<Self> {
        options.validate()?;
        let mut buffer = Self::new(sink, event_loop);
        buffer.soft_limit = options.soft_limit;
        Ok(buffer)
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> BufferState {
        self.state
    }

    /// Whether `write` still queues data.
    #[inline]
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        matches!(self.state, BufferState::Open { .. })
    }

    /// Whether the buffer is subscribed to write-readiness.
    #[inline]
    #[must_use]
    pub const fn is_listening(&self) -> bool {
        self.state.is_listening()
    }

    /// Bytes waiting to be sent.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    #[must_use]
    pub const fn soft_limit(&self) -> usize {
        self.soft_limit
    }

    /// Change the soft limit. Takes effect from the next write or flush.
    pub fn set_soft_limit(&mut self, limit: usize) -> Result<()> {
        validate_soft_limit(limit)?;
        self.soft_limit = limit;
        Ok(())
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    #[must_use]
    pub const fn event_loop(&self) -> &L {
        &self.event_loop
    }

    /// Open a fresh monitor channel for this buffer.
    ///
    /// Replaces any previously installed monitor.
    pub fn monitor(&mut self) -> BufferMonitor {
        let (tx, rx) = create_monitor();
        self.events = Some(tx);
        rx
    }

    /// Publish events on an existing channel, typically shared by several buffers.
    pub fn set_monitor(&mut self, sender: BufferEventSender) {
        self.events = Some(sender);
    }

    /// Queue `data` for sending.
    ///
    /// Returns `true` while the queue stays below the soft limit, `false` once
    /// the caller should pause and wait for [`BufferEvent::Drain`]. The data
    /// is queued either way.
    ///
    /// After `end()` or `close()` the call does nothing and returns `false`.
    pub fn write(&mut self, data: impl Into<Bytes>) -> bool {
        let BufferState::Open { listening } = self.state else {
            trace!("[BUFFER] {} not writable, ignoring write", self.id);
            return false;
        };

        let data = data.into();
        if !data.is_empty() {
            trace!("[BUFFER] {} queuing {} bytes", self.id, data.len());
            self.queue.push(data);
            if !listening {
                self.event_loop.add_write_stream(self.id, &self.sink);
                self.state = BufferState::Open { listening: true };
            }
        }

        self.queue.len() < self.soft_limit
    }

    /// Stop accepting writes and close once everything queued is sent.
    ///
    /// Closes immediately when nothing is queued. Repeated calls do nothing.
    pub fn end(&mut self) {
        match self.state {
            BufferState::Open { listening: true } => {
                debug!(
                    "[BUFFER] {} ending with {} bytes pending",
                    self.id,
                    self.queue.len()
                );
                self.state = BufferState::Ending;
            }
            BufferState::Open { listening: false } => self.close(),
            BufferState::Ending | BufferState::Closed => {}
        }
    }

    /// Queue a final chunk, then [`end`](Self::end).
    pub fn end_with(&mut self, data: impl Into<Bytes>) {
        self.write(data);
        self.end();
    }

    /// Terminate immediately, discarding anything still queued.
    ///
    /// Emits [`BufferEvent::Close`] the first time only.
    pub fn close(&mut self) {
        match self.state {
            BufferState::Closed => return,
            BufferState::Open { listening: true } | BufferState::Ending => {
                self.event_loop.remove_write_stream(self.id, &self.sink);
            }
            BufferState::Open { listening: false } => {}
        }
        self.terminate();
    }

    /// Write-readiness handler.
    ///
    /// Flushes as much of the queue as the sink accepts. Failures are
    /// published as [`BufferEvent::Error`] and leave the queue untouched so
    /// the next notification retries.
    pub fn handle_write(&mut self) {
        if !self.state.is_listening() {
            trace!("[BUFFER] {} readiness while not subscribed, ignoring", self.id);
            return;
        }

        if !self.sink.is_valid() {
            self.emit_error(WriteError::InvalidSink);
            return;
        }

        let len = self.queue.len();
        let result = {
            let chunks = self.queue.chunks();
            self.sink.write_vectored(&chunks)
        };

        let sent = match result {
            Ok(sent) => sent,
            Err(err) => {
                self.emit_error(err.into());
                return;
            }
        };
        if sent > len {
            warn!(
                "[BUFFER] {} sink reported {} bytes sent of {}",
                self.id, sent, len
            );
        }
        let sent = sent.min(len);

        trace!("[BUFFER] {} flushed {}/{} bytes", self.id, sent, len);
        self.queue.advance(sent);

        if len >= self.soft_limit && len - sent < self.soft_limit {
            self.emit(BufferEvent::Drain(self.id));
        }

        if self.queue.is_empty() {
            self.full_drain();
        }
    }

    fn full_drain(&mut self) {
        self.event_loop.remove_write_stream(self.id, &self.sink);
        trace!("[BUFFER] {} fully drained", self.id);
        match self.state {
            BufferState::Ending => self.terminate(),
            _ => self.state = BufferState::Open { listening: false },
        }
    }

    /// Enter `Closed`. The caller has already unsubscribed.
    fn terminate(&mut self) {
        let discarded = self.queue.len();
        self.state = BufferState::Closed;
        self.queue.clear();
        debug!(
            "[BUFFER] {} closed, discarded {} bytes",
            self.id, discarded
        );
        self.emit(BufferEvent::Close(self.id));
    }

    fn emit_error(&self, error: WriteError) {
        debug!("[BUFFER] {} flush failed: {}", self.id, error);
        self.emit(BufferEvent::Error {
            buffer: self.id,
            error,
        });
    }

    fn emit(&self, event: BufferEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                trace!("[BUFFER] {} monitor dropped, event discarded", self.id);
            }
        }
    }
}

impl<S, L> Drop for WriteBuffer<S, L>
where
    S: Sink,
    L: EventLoop<S>,
{
    fn drop(&mut self) {
        if self.state.is_listening() {
            trace!("[BUFFER] {} dropped while subscribed", self.id);
            self.event_loop.remove_write_stream(self.id, &self.sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BufferError, SinkError};
    use crate::event_loop::ReadyLoop;
    use crate::sink::MemorySink;
    use std::rc::Rc;

    type TestBuffer = WriteBuffer<MemorySink, Rc<ReadyLoop>>;

    fn setup(soft_limit: usize) -> (TestBuffer, Rc<ReadyLoop>, BufferMonitor) {
        let lp = Rc::new(ReadyLoop::new());
        let opts = BufferOptions::new().with_soft_limit(soft_limit);
        let mut buf = WriteBuffer::with_options(MemorySink::new(), Rc::clone(&lp), opts).unwrap();
        let events = buf.monitor();
        (buf, lp, events)
    }

    fn drain_events(events: &BufferMonitor) -> Vec<BufferEvent> {
        events.try_iter().collect()
    }

    #[test]
    fn test_default_soft_limit() {
        let buf = WriteBuffer::new(MemorySink::new(), ReadyLoop::new());
        assert_eq!(buf.soft_limit(), 2048);
        assert_eq!(buf.state(), BufferState::Open { listening: false });
        assert!(buf.is_writable());
    }

    #[test]
    fn test_zero_soft_limit_rejected() {
        let opts = BufferOptions::new().with_soft_limit(0);
        let err = WriteBuffer::with_options(MemorySink::new(), ReadyLoop::new(), opts).unwrap_err();
        assert!(matches!(err, BufferError::InvalidOptions(_)));

        let mut buf = WriteBuffer::new(MemorySink::new(), ReadyLoop::new());
        assert!(buf.set_soft_limit(0).is_err());
        assert_eq!(buf.soft_limit(), 2048);
        buf.set_soft_limit(4).unwrap();
        assert_eq!(buf.soft_limit(), 4);
    }

    #[test]
    fn test_write_subscribes_once() {
        let (mut buf, lp, _events) = setup(100);
        assert!(buf.write("abc"));
        assert!(buf.write("def"));
        assert_eq!(buf.len(), 6);
        assert!(buf.is_listening());
        assert_eq!(lp.add_count(), 1);
    }

    #[test]
    fn test_empty_write_does_not_subscribe() {
        let (mut buf, lp, _events) = setup(100);
        assert!(buf.write(Bytes::new()));
        assert!(!buf.is_listening());
        assert_eq!(lp.add_count(), 0);
    }

    #[test]
    fn test_partial_flush_keeps_remainder() {
        let (mut buf, lp, events) = setup(100);
        buf.sink_mut().set_write_limit(Some(4));
        buf.write("hello ");
        buf.write("world");

        lp.dispatch(&mut buf);
        assert_eq!(buf.len(), 7);
        assert_eq!(buf.sink().written(), b"hell");
        assert!(buf.is_listening());

        buf.sink_mut().set_write_limit(None);
        lp.dispatch(&mut buf);
        assert!(buf.is_empty());
        assert_eq!(buf.sink().written(), b"hello world");
        assert!(!lp.is_registered(buf.id()));
        assert!(drain_events(&events).is_empty());
    }

    #[test]
    fn test_zero_byte_flush_is_not_an_error() {
        let (mut buf, lp, events) = setup(100);
        buf.sink_mut().set_write_limit(Some(0));
        buf.write("abc");
        lp.dispatch(&mut buf);
        assert_eq!(buf.len(), 3);
        assert!(buf.is_listening());
        assert!(drain_events(&events).is_empty());
    }

    #[test]
    fn test_rejected_write_keeps_queue() {
        let (mut buf, lp, events) = setup(100);
        buf.sink_mut().fail_next(SinkError::Rejected);
        buf.write("abc");
        lp.dispatch(&mut buf);

        assert_eq!(buf.len(), 3);
        assert!(buf.is_listening());
        assert_eq!(
            drain_events(&events),
            vec![BufferEvent::Error {
                buffer: buf.id(),
                error: WriteError::Rejected
            }]
        );

        // next readiness retries naturally
        lp.dispatch(&mut buf);
        assert!(buf.is_empty());
        assert_eq!(buf.sink().written(), b"abc");
    }

    #[test]
    fn test_drain_exactly_at_limit_does_not_fire() {
        // 12 queued, 2 sent: 10 remain, which is not below the limit
        let (mut buf, lp, events) = setup(10);
        buf.sink_mut().set_write_limit(Some(2));
        assert!(!buf.write("123456789012"));
        lp.dispatch(&mut buf);
        assert_eq!(buf.len(), 10);
        assert!(drain_events(&events).is_empty());

        // 10 queued, 1 sent: crosses below
        buf.sink_mut().set_write_limit(Some(1));
        lp.dispatch(&mut buf);
        assert_eq!(drain_events(&events), vec![BufferEvent::Drain(buf.id())]);
    }

    #[test]
    fn test_spurious_readiness_ignored() {
        let (mut buf, _lp, events) = setup(10);
        buf.handle_write();
        assert_eq!(buf.sink().write_calls(), 0);
        assert!(drain_events(&events).is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let lp = Rc::new(ReadyLoop::new());
        {
            let mut buf = WriteBuffer::new(MemorySink::new(), Rc::clone(&lp));
            buf.write("pending");
            assert_eq!(lp.len(), 1);
        }
        assert!(lp.is_empty());
        assert_eq!(lp.remove_count(), 1);
    }

    #[test]
    fn test_events_without_monitor_are_discarded() {
        let lp = ReadyLoop::new();
        let mut buf = WriteBuffer::new(MemorySink::new(), &lp);
        buf.write("x");
        buf.close();
        assert_eq!(buf.state(), BufferState::Closed);
    }
}
