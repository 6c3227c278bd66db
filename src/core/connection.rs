//! TCP connection to a chat server
//!
//! Owns the socket and the paired line reader/writer. The reader is handed
//! to the inbound loop once; the writer stays here behind a mutex so that
//! `close_fully` can release it from either thread.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, info};

use super::line::{LineError, LineReader, LineWriter};

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to prepare socket: {0}")]
    Socket(#[source] io::Error),

    #[error("Failed to send: {0}")]
    Send(#[source] LineError),

    #[error("Connection is closed for writing")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ConnectionError>;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    /// Write side released, read side still usable
    HalfClosed,
    Closed,
}

/// A connection to a chat server
pub struct Connection {
    /// Control handle used for shutdown
    socket: TcpStream,
    peer: SocketAddr,
    state: Mutex<ConnectionState>,
    writer: Mutex<Option<LineWriter<TcpStream>>>,
    reader: Mutex<Option<LineReader<TcpStream>>>,
}

impl Connection {
    /// Connect to `host:port`
    pub fn open(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let socket = TcpStream::connect((host, port)).map_err(|source| ConnectionError::Connect {
            addr: addr.clone(),
            source,
        })?;
        Self::from_stream(socket)
    }

    /// Wrap an already-connected stream
    pub fn from_stream(socket: TcpStream) -> Result<Self> {
        let peer = socket.peer_addr().map_err(ConnectionError::Socket)?;
        let reader = socket.try_clone().map_err(ConnectionError::Socket)?;
        let writer = socket.try_clone().map_err(ConnectionError::Socket)?;

        info!("Connected to {}", peer);

        Ok(Self {
            socket,
            peer,
            state: Mutex::new(ConnectionState::Open),
            writer: Mutex::new(Some(LineWriter::new(writer))),
            reader: Mutex::new(Some(LineReader::new(reader))),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    /// Hand the reader to the inbound loop. Only the first call gets it.
    pub fn take_reader(&self) -> Option<LineReader<TcpStream>> {
        lock(&self.reader).take()
    }

    /// Send one line. Fails once the write side has been released.
    pub fn send_line(&self, text: &str) -> Result<()> {
        let mut writer = lock(&self.writer);
        match writer.as_mut() {
            Some(w) => w.send_line(text).map_err(ConnectionError::Send),
            None => Err(ConnectionError::Closed),
        }
    }

    /// Release the write side only.
    ///
    /// The peer may or may not treat this as end-of-stream, and it does not
    /// unblock a local read; use `close_fully` for that.
    pub fn close_outbound(&self) {
        let mut state = lock(&self.state);
        if *state != ConnectionState::Open {
            return;
        }
        *state = ConnectionState::HalfClosed;

        if let Err(e) = self.socket.shutdown(Shutdown::Write) {
            debug!("Write shutdown on {} failed: {}", self.peer, e);
        }
        lock(&self.writer).take();
        info!("Connection to {} half-closed", self.peer);
    }

    /// Release the socket, reader and writer.
    ///
    /// Safe to call from both the foreground and the inbound loop at once;
    /// exactly one call performs the release and returns `true`, the others
    /// are no-ops that return `false`. Any blocked read on the socket
    /// returns end-of-stream afterwards.
    pub fn close_fully(&self) -> bool {
        let mut state = lock(&self.state);
        if *state == ConnectionState::Closed {
            return false;
        }
        *state = ConnectionState::Closed;

        // Shut down before touching the writer: a send blocked in write()
        // holds the writer lock until the socket errors out.
        match self.socket.shutdown(Shutdown::Both) {
            Ok(()) => {}
            // Already torn down by the peer
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
            Err(e) => debug!("Shutdown on {} failed: {}", self.peer, e),
        }
        lock(&self.writer).take();
        lock(&self.reader).take();

        info!("Connection to {} closed", self.peer);
        true
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close_fully();
    }
}

/// Lock a mutex, recovering the data if a thread panicked while holding it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
