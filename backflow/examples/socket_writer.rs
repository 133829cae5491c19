//! Example: pushing a large payload through a non-blocking socket.
//!
//! This example shows how to:
//! - Wrap a non-blocking socket in an `IoSink`
//! - Pause a producer on backpressure and resume on `Drain`
//! - End the buffer gracefully once everything is queued
//!
//! Run with:
//! ```bash
//! RUST_LOG=trace cargo run --example socket_writer
//! ```

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use backflow::prelude::*;
    use std::io::{self, Read};
    use std::os::unix::net::UnixStream;
    use std::rc::Rc;

    backflow::dev_tracing::init_tracing();

    let (writer, mut reader) = UnixStream::pair()?;
    writer.set_nonblocking(true)?;
    reader.set_nonblocking(true)?;

    let lp = Rc::new(ReadyLoop::new());
    let opts = BufferOptions::new().with_soft_limit(64 * 1024);
    let mut buf = WriteBuffer::with_options(IoSink::new(writer), Rc::clone(&lp), opts)?;
    let events = buf.monitor();

    let chunk = vec![b'x'; 16 * 1024];
    let mut remaining_chunks = 256;
    let mut received = 0usize;
    let mut scratch = [0u8; 64 * 1024];
    let mut paused = false;

    loop {
        // Produce until the buffer asks us to back off
        while !paused && remaining_chunks > 0 {
            remaining_chunks -= 1;
            if !buf.write(chunk.clone()) {
                println!("backpressure at {} queued bytes", buf.len());
                paused = true;
            }
        }
        if remaining_chunks == 0 && buf.is_writable() {
            buf.end();
        }

        lp.dispatch(&mut buf);

        // Play the peer
        loop {
            match reader.read(&mut scratch) {
                Ok(0) => break,
                Ok(n) => received += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }

        let mut closed = false;
        for event in events.try_iter() {
            match event {
                BufferEvent::Drain(id) => {
                    println!("{id} drained, resuming");
                    paused = false;
                }
                BufferEvent::Close(id) => {
                    println!("{id} closed");
                    closed = true;
                }
                BufferEvent::Error { error, .. } => {
                    eprintln!("flush failed: {error}");
                    buf.close();
                }
            }
        }
        if closed {
            break;
        }
    }

    // Collect whatever the last flush left in the socket
    loop {
        match reader.read(&mut scratch) {
            Ok(0) => break,
            Ok(n) => received += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("peer received {received} bytes");
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    println!("This example requires a unix platform");
}
