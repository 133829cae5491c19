//! Write-readiness subscription.
//!
//! The buffer never polls. It tells the loop when it wants to hear about
//! write-readiness for its sink and when it no longer does; the loop glue
//! calls [`WriteBuffer::handle_write`](crate::write_buffer::WriteBuffer::handle_write)
//! for every readiness notification on a registered buffer.

use crate::monitor::BufferId;
use crate::sink::Sink;
use crate::write_buffer::WriteBuffer;
use hashbrown::HashSet;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{trace, warn};

/// Readiness-notification loop, as seen by a write buffer.
///
/// Methods take `&self`: one loop serves many buffers, so implementations
/// keep their registry behind interior mutability (or hand out a registry
/// handle, as `mio::Registry` does).
pub trait EventLoop<S: ?Sized> {
    /// Start reporting write-readiness of `sink` for buffer `id`.
    ///
    /// Called at most once per subscription.
    fn add_write_stream(&self, id: BufferId, sink: &S);

    /// Stop reporting write-readiness for buffer `id`.
    ///
    /// Only called while subscribed.
    fn remove_write_stream(&self, id: BufferId, sink: &S);
}

impl<S: ?Sized, L: EventLoop<S> + ?Sized> EventLoop<S> for &L {
    fn add_write_stream(&self, id: BufferId, sink: &S) {
        (**self).add_write_stream(id, sink);
    }

    fn remove_write_stream(&self, id: BufferId, sink: &S) {
        (**self).remove_write_stream(id, sink);
    }
}

impl<S: ?Sized, L: EventLoop<S> + ?Sized> EventLoop<S> for Rc<L> {
    fn add_write_stream(&self, id: BufferId, sink: &S) {
        (**self).add_write_stream(id, sink);
    }

    fn remove_write_stream(&self, id: BufferId, sink: &S) {
        (**self).remove_write_stream(id, sink);
    }
}

/// In-process interest registry.
///
/// Treats every registered sink as permanently writable: whoever drives the
/// loop dispatches readiness to registered buffers through
/// [`dispatch`](Self::dispatch). Registration counts are kept so callers can
/// observe subscription churn.
#[derive(Debug, Default)]
pub struct ReadyLoop {
    interest: RefCell<HashSet<BufferId>>,
    adds: Cell<usize>,
    removes: Cell<usize>,
}

impl ReadyLoop {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_registered(&self, id: BufferId) -> bool {
        self.interest.borrow().contains(&id)
    }

    /// Registered buffers, in ascending id order.
    #[must_use]
    pub fn registered(&self) -> Vec<BufferId> {
        let mut ids: Vec<_> = self.interest.borrow().iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interest.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interest.borrow().is_empty()
    }

    /// Total `add_write_stream` calls seen.
    #[must_use]
    pub fn add_count(&self) -> usize {
        self.adds.get()
    }

    /// Total `remove_write_stream` calls seen.
    #[must_use]
    pub fn remove_count(&self) -> usize {
        self.removes.get()
    }

    /// Deliver one readiness notification to `buffer` if it is registered.
    ///
    /// Returns whether the buffer's write handler ran.
    pub fn dispatch<S, L>(&self, buffer: &mut WriteBuffer<S, L>) -> bool
    where
        S: Sink,
        L: EventLoop<S>,
    {
        if !self.is_registered(buffer.id()) {
            return false;
        }
        buffer.handle_write();
        true
    }
}

impl<S: ?Sized> EventLoop<S> for ReadyLoop {
    fn add_write_stream(&self, id: BufferId, _sink: &S) {
        self.adds.set(self.adds.get() + 1);
        if !self.interest.borrow_mut().insert(id) {
            warn!("[LOOP] {} registered twice", id);
            return;
        }
        trace!("[LOOP] Watching {} for write-readiness", id);
    }

    fn remove_write_stream(&self, id: BufferId, _sink: &S) {
        self.removes.set(self.removes.get() + 1);
        if !self.interest.borrow_mut().remove(&id) {
            warn!("[LOOP] {} removed while not registered", id);
            return;
        }
        trace!("[LOOP] Stopped watching {}", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    #[test]
    fn test_registration_bookkeeping() {
        let lp = ReadyLoop::new();
        let sink = MemorySink::new();
        let a = BufferId::next();
        let b = BufferId::next();

        EventLoop::<MemorySink>::add_write_stream(&lp, b, &sink);
        EventLoop::<MemorySink>::add_write_stream(&lp, a, &sink);
        assert_eq!(lp.registered(), vec![a, b]);
        assert_eq!(lp.len(), 2);

        EventLoop::<MemorySink>::remove_write_stream(&lp, a, &sink);
        assert!(!lp.is_registered(a));
        assert!(lp.is_registered(b));
        assert_eq!(lp.add_count(), 2);
        assert_eq!(lp.remove_count(), 1);
    }

    #[test]
    fn test_shared_handle_forwards() {
        let lp = Rc::new(ReadyLoop::new());
        let handle = Rc::clone(&lp);
        let sink = MemorySink::new();
        let id = BufferId::next();

        EventLoop::<MemorySink>::add_write_stream(&handle, id, &sink);
        assert!(lp.is_registered(id));
        assert!(!lp.is_empty());
    }
}
