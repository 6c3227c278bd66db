//! Inbound loop
//!
//! A dedicated thread that reads lines from the server and posts them to
//! the foreground over a channel. The foreground owns the display, so the
//! loop never touches it directly.

use std::io::Read;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::connection::Connection;
use super::line::{LineReader, ReadLine};

/// Events posted from the inbound loop to the foreground
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A line received from the server
    Line(String),
    /// The loop is draining; no more lines follow
    Ended(EndReason),
}

/// Why the inbound loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// The server closed the stream; the loop released the connection
    Remote,
    /// The connection was closed locally before the read returned
    Local,
    /// A read failed; handled like end-of-stream
    ReadError(String),
}

/// Inbound loop state machine: Running -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Draining,
    Stopped,
}

impl LoopState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => LoopState::Running,
            1 => LoopState::Draining,
            _ => LoopState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            LoopState::Running => 0,
            LoopState::Draining => 1,
            LoopState::Stopped => 2,
        }
    }
}

/// Handle to a running inbound loop
pub struct InboundLoop {
    state: Arc<AtomicU8>,
    thread: Option<JoinHandle<()>>,
}

impl InboundLoop {
    /// Spawn the loop on its own thread.
    ///
    /// The loop only keeps a weak reference to the connection, used to
    /// release it when the stream ends.
    pub fn spawn<R>(
        reader: LineReader<R>,
        connection: Weak<Connection>,
        events: Sender<InboundEvent>,
    ) -> Self
    where
        R: Read + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(LoopState::Running.as_u8()));
        let thread_state = state.clone();
        let thread = thread::spawn(move || {
            run(reader, &connection, &events, &thread_state);
        });

        Self {
            state,
            thread: Some(thread),
        }
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Wait for the loop thread to exit.
    ///
    /// Only returns once the loop is Stopped, so the connection must be
    /// closed (or the server gone) for this not to block.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("Inbound loop thread panicked");
                self.state.store(LoopState::Stopped.as_u8(), Ordering::SeqCst);
            }
        }
    }
}

fn set_state(state: &AtomicU8, next: LoopState) {
    debug!("Inbound loop -> {:?}", next);
    state.store(next.as_u8(), Ordering::SeqCst);
}

fn run<R: Read>(
    mut reader: LineReader<R>,
    connection: &Weak<Connection>,
    events: &Sender<InboundEvent>,
    state: &AtomicU8,
) {
    let mut read_error = None;

    loop {
        match reader.next_line() {
            Ok(ReadLine::Line(line)) => {
                // Deliver before issuing the next read
                if events.send(InboundEvent::Line(line)).is_err() {
                    debug!("Foreground gone, stopping inbound loop");
                    break;
                }
            }
            Ok(ReadLine::EndOfStream) => break,
            Err(e) => {
                warn!("Read failed, ending session: {}", e);
                read_error = Some(e.to_string());
                break;
            }
        }
    }

    set_state(state, LoopState::Draining);

    // Whichever side gets here first releases the connection
    let released = match connection.upgrade() {
        Some(conn) => conn.close_fully(),
        None => false,
    };

    let reason = match read_error {
        Some(e) => EndReason::ReadError(e),
        None if released => EndReason::Remote,
        None => EndReason::Local,
    };
    info!("Inbound loop ended: {:?}", reason);

    // The receiver may already be gone during teardown
    let _ = events.send(InboundEvent::Ended(reason));

    set_state(state, LoopState::Stopped);
}
