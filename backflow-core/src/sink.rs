//! Output sinks.
//!
//! A [`Sink`] is the non-blocking handle a [`WriteBuffer`](crate::write_buffer::WriteBuffer)
//! flushes into. Writes are partial: the sink reports how many bytes it took
//! and the buffer keeps the rest for the next readiness notification.
//!
//! - [`IoSink`] adapts any `std::io::Write` put into non-blocking mode
//!   (`TcpStream`, `UnixStream`, pipes).
//! - [`MemorySink`] is an in-memory sink whose acceptance and failures can be
//!   scripted.

use crate::error::{Diagnostic, SinkError};
use std::collections::VecDeque;
use std::io::{self, IoSlice};

/// Non-blocking write capability.
pub trait Sink {
    /// Whether the handle is still usable.
    ///
    /// Queried before every flush attempt.
    fn is_valid(&self) -> bool;

    /// Write as much of `buf` as the sink accepts without blocking.
    ///
    /// Returns the number of bytes accepted, `0 ..= buf.len()`.
    fn write(&mut self, buf: &[u8]) -> Result<usize, SinkError>;

    /// Vectored variant of [`write`](Self::write).
    ///
    /// The default writes the first non-empty slice only.
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> Result<usize, SinkError> {
        let buf = bufs.iter().find(|b| !b.is_empty()).map_or(&[][..], |b| &**b);
        self.write(buf)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, SinkError> {
        (**self).write(buf)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> Result<usize, SinkError> {
        (**self).write_vectored(bufs)
    }
}

/// [`Sink`] over a non-blocking `std::io::Write`.
///
/// | `io` result                        | sink result                  |
/// |------------------------------------|------------------------------|
/// | `Ok(n)`, `n > 0`                   | `Ok(n)`                      |
/// | `Ok(0)` for non-empty input        | `Err(SinkError::Rejected)`   |
/// | `WouldBlock` / `Interrupted`       | `Ok(0)`                      |
/// | any other error                    | `Err(SinkError::Io(..))`     |
#[derive(Debug)]
pub struct IoSink<W> {
    inner: Option<W>,
}

impl<W: io::Write> IoSink<W> {
    /// Wrap a writer. The caller is responsible for putting it in
    /// non-blocking mode.
    #[must_use]
    pub const fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }

    #[must_use]
    pub const fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.inner.as_mut()
    }

    /// Release the writer. The sink is invalid afterwards.
    pub fn close(&mut self) -> Option<W> {
        self.inner.take()
    }
}

#[track_caller]
fn map_io(res: io::Result<usize>, requested: usize) -> Result<usize, SinkError> {
    match res {
        Ok(0) if requested > 0 => Err(SinkError::Rejected),
        Ok(n) => Ok(n),
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
            Ok(0)
        }
        Err(e) => Err(SinkError::Io(Diagnostic::from_io(&e))),
    }
}

fn closed() -> SinkError {
    SinkError::Io(Diagnostic::new(io::ErrorKind::NotConnected, "sink is closed"))
}

impl<W: io::Write> Sink for IoSink<W> {
    fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, SinkError> {
        let Some(w) = self.inner.as_mut() else {
            return Err(closed());
        };
        map_io(w.write(buf), buf.len())
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> Result<usize, SinkError> {
        let Some(w) = self.inner.as_mut() else {
            return Err(closed());
        };
        let requested = bufs.iter().map(|b| b.len()).sum();
        map_io(w.write_vectored(bufs), requested)
    }
}

/// In-memory [`Sink`] with scripted behavior.
///
/// Accepted bytes are appended to [`written`](Self::written). A per-call
/// write limit simulates a congested peer, queued failures are returned by
/// the next write calls in order, and [`invalidate`](Self::invalidate)
/// simulates a closed descriptor.
#[derive(Debug)]
pub struct MemorySink {
    written: Vec<u8>,
    write_limit: Option<usize>,
    failures: VecDeque<SinkError>,
    valid: bool,
    write_calls: usize,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            written: Vec::new(),
            write_limit: None,
            failures: VecDeque::new(),
            valid: true,
            write_calls: 0,
        }
    }

    /// Accept at most `limit` bytes per write call.
    #[must_use]
    pub const fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    pub fn set_write_limit(&mut self, limit: Option<usize>) {
        self.write_limit = limit;
    }

    /// Make the next write call fail with `err` without accepting anything.
    pub fn fail_next(&mut self, err: SinkError) {
        self.failures.push_back(err);
    }

    /// Mark the handle as no longer usable.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }

    /// Number of write calls made, failed ones included.
    #[must_use]
    pub const fn write_calls(&self) -> usize {
        self.write_calls
    }
}

impl Sink for MemorySink {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, SinkError> {
        self.write_vectored(&[IoSlice::new(buf)])
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> Result<usize, SinkError> {
        self.write_calls += 1;
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }

        let mut budget = self.write_limit.unwrap_or(usize::MAX);
        let mut sent = 0;
        for buf in bufs {
            if budget == 0 {
                break;
            }
            let take = budget.min(buf.len());
            self.written.extend_from_slice(&buf[..take]);
            budget -= take;
            sent += take;
        }
        Ok(sent)
    }
}
