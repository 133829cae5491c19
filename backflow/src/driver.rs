//! Driving buffers from a [`ReadyLoop`].

use backflow_core::event_loop::{EventLoop, ReadyLoop};
use backflow_core::sink::Sink;
use backflow_core::write_buffer::WriteBuffer;
use tracing::debug;

/// Deliver readiness to `buffer` until it unsubscribes or `max_rounds`
/// notifications have been delivered.
///
/// Returns the number of notifications delivered. A buffer whose sink keeps
/// failing stays subscribed, so `max_rounds` bounds the work done here.
pub fn drive<S, L>(ready: &ReadyLoop, buffer: &mut WriteBuffer<S, L>, max_rounds: usize) -> usize
where
    S: Sink,
    L: EventLoop<S>,
{
    let mut rounds = 0;
    while rounds < max_rounds && ready.dispatch(buffer) {
        rounds += 1;
    }
    if buffer.is_listening() {
        debug!(
            "[DRIVER] {} still has {} bytes after {} rounds",
            buffer.id(),
            buffer.len(),
            rounds
        );
    }
    rounds
}
