use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;
use std::io::IoSlice;

/// FIFO queue of unsent output bytes.
///
/// Writes are kept as the `Bytes` segments they arrived in, so queuing a
/// payload never copies it. A flush hands every segment to the sink at once
/// through [`chunks`](Self::chunks) and then trims whatever the sink accepted
/// with [`advance`](Self::advance).
///
/// # Tradeoffs
///
/// - **Push**: O(1), refcount only
/// - **Advance**: drops fully-sent segments, splits at most one
/// - **Contiguous view**: [`to_bytes`](Self::to_bytes) is O(1) for a single
///   segment and copies otherwise
#[derive(Debug, Default)]
pub struct SegmentedBuffer {
    segs: VecDeque<Bytes>,
    len: usize,
}

impl SegmentedBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segs: VecDeque::new(),
            len: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of segments currently queued.
    #[inline]
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segs.len()
    }

    #[inline]
    pub fn push(&mut self, bytes: Bytes) {
        if bytes.is_empty() {
            return;
        }
        self.len += bytes.len();
        self.segs.push_back(bytes);
    }

    /// Borrow every queued segment, in order, for a vectored write.
    #[must_use]
    pub fn chunks(&self) -> Vec<IoSlice<'_>> {
        self.segs.iter().map(|seg| IoSlice::new(seg)).collect()
    }

    /// Advance the queue by `n` bytes, dropping fully-consumed segments.
    ///
    /// # Panics
    ///
    /// Panics if `n > self.len`.
    pub fn advance(&mut self, mut n: usize) {
        assert!(n <= self.len);
        self.len -= n;

        while n > 0 {
            let Some(mut front) = self.segs.pop_front() else {
                break;
            };
            if n >= front.len() {
                n -= front.len();
                continue;
            }
            // partially consumed
            front.advance(n);
            self.segs.push_front(front);
            break;
        }
    }

    /// Discard everything queued.
    pub fn clear(&mut self) {
        self.segs.clear();
        self.len = 0;
    }

    /// Contiguous copy of the queued bytes.
    ///
    /// Zero-copy when a single segment is queued.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self.segs.len() {
            0 => Bytes::new(),
            1 => self.segs[0].clone(),
            _ => {
                let mut out = BytesMut::with_capacity(self.len);
                for seg in &self.segs {
                    out.extend_from_slice(seg);
                }
                out.freeze()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_skips_empty_segments() {
        let mut buf = SegmentedBuffer::new();
        buf.push(Bytes::new());
        assert!(buf.is_empty());
        assert_eq!(buf.segment_count(), 0);

        buf.push(Bytes::from_static(b"abc"));
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.segment_count(), 1);
    }

    #[test]
    fn advance_splits_partial_segment() {
        let mut buf = SegmentedBuffer::new();
        buf.push(Bytes::from_static(b"hello"));
        buf.push(Bytes::from_static(b"world"));

        buf.advance(7);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.segment_count(), 1);
        assert_eq!(&buf.to_bytes()[..], b"rld");
    }

    #[test]
    fn chunks_follow_queue_order() {
        let mut buf = SegmentedBuffer::new();
        buf.push(Bytes::from_static(b"ab"));
        buf.push(Bytes::from_static(b"cde"));
        buf.advance(1);

        let chunks = buf.chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(&*chunks[0], b"b");
        assert_eq!(&*chunks[1], b"cde");
    }

    #[test]
    fn clear_drops_everything() {
        let mut buf = SegmentedBuffer::new();
        buf.push(Bytes::from_static(b"pending"));
        buf.clear();
        assert!(buf.is_empty());
        assert!(buf.chunks().is_empty());
        assert!(buf.to_bytes().is_empty());
    }

    #[test]
    #[should_panic]
    fn advance_past_end_panics() {
        let mut buf = SegmentedBuffer::new();
        buf.push(Bytes::from_static(b"ab"));
        buf.advance(3);
    }
}
