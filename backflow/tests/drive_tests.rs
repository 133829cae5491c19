//! Integration tests for the public API surface

use backflow::prelude::*;
use backflow::{drive, SinkError};
use std::rc::Rc;

#[test]
fn test_drive_until_drained() {
    backflow::dev_tracing::init_tracing();
    let lp = Rc::new(ReadyLoop::new());
    let sink = MemorySink::new().with_write_limit(3);
    let mut buf = WriteBuffer::new(sink, Rc::clone(&lp));

    buf.write("0123456789");
    let rounds = drive(&lp, &mut buf, 100);

    assert_eq!(rounds, 4);
    assert!(buf.is_empty());
    assert!(!buf.is_listening());
    assert_eq!(buf.sink().written(), b"0123456789");
}

#[test]
fn test_drive_stops_at_round_limit() {
    let lp = Rc::new(ReadyLoop::new());
    let mut buf = WriteBuffer::new(MemorySink::new(), Rc::clone(&lp));
    let events = buf.monitor();
    for _ in 0..5 {
        buf.sink_mut().fail_next(SinkError::Rejected);
    }

    buf.write("stuck");
    let rounds = drive(&lp, &mut buf, 3);

    assert_eq!(rounds, 3);
    assert!(buf.is_listening());
    assert_eq!(events.try_iter().count(), 3);
}

#[test]
fn test_drive_idle_buffer_does_nothing() {
    let lp = Rc::new(ReadyLoop::new());
    let mut buf = WriteBuffer::new(MemorySink::new(), Rc::clone(&lp));
    assert_eq!(drive(&lp, &mut buf, 10), 0);
    assert_eq!(buf.sink().write_calls(), 0);
}

#[test]
fn test_drive_completes_graceful_end() {
    let lp = Rc::new(ReadyLoop::new());
    let opts = BufferOptions::new().with_soft_limit(4);
    let sink = MemorySink::new().with_write_limit(2);
    let mut buf = WriteBuffer::with_options(sink, Rc::clone(&lp), opts).unwrap();
    let events = buf.monitor();

    assert!(!buf.write("abcdef"));
    buf.end();
    drive(&lp, &mut buf, 10);

    let id = buf.id();
    let seen: Vec<_> = events.try_iter().collect();
    // 6 -> 4 stays at the limit, 4 -> 2 crosses, 2 -> 0 closes
    assert_eq!(seen, vec![BufferEvent::Drain(id), BufferEvent::Close(id)]);
    assert_eq!(buf.state(), BufferState::Closed);
    assert!(lp.is_empty());
}
