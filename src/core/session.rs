//! Session management
//!
//! Binds a display name to a connection, tags outgoing text, and sequences
//! shutdown between the foreground and the inbound loop.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use super::connection::{Connection, ConnectionError, ConnectionState};
use super::inbound::{EndReason, InboundEvent, InboundLoop, LoopState};
use super::line::LineError;
use super::message::Message;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Display name must be non-empty and on a single line")]
    InvalidName,

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Receives what the session has to show. Always called on the thread that
/// calls `Session::process_events`.
pub trait DisplaySink {
    /// A line received from the server
    fn on_incoming_line(&mut self, line: &str);

    /// The inbound side is finished; no more lines follow
    fn on_session_ended(&mut self, reason: &EndReason);
}

/// A chat session
pub struct Session {
    display_name: String,
    connection: Arc<Connection>,
    inbound: InboundLoop,
    events: Receiver<InboundEvent>,
    /// Set once `Ended` has been delivered to a sink
    ended: bool,
}

impl Session {
    /// Connect to `host:port` as `display_name` and start the inbound loop
    pub fn connect(display_name: &str, host: &str, port: u16) -> Result<Self> {
        validate_name(display_name)?;
        let connection = Connection::open(host, port)?;
        Self::start(display_name, connection)
    }

    /// Start a session over an already-open connection
    pub fn start(display_name: &str, connection: Connection) -> Result<Self> {
        validate_name(display_name)?;
        let connection = Arc::new(connection);
        let reader = connection.take_reader().ok_or(ConnectionError::Closed)?;

        let (tx, rx) = mpsc::channel();
        let inbound = InboundLoop::spawn(reader, Arc::downgrade(&connection), tx);

        info!("Session started as [{}] with {}", display_name, connection.peer_addr());

        Ok(Self {
            display_name: display_name.to_string(),
            connection,
            inbound,
            events: rx,
            ended: false,
        })
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[allow(dead_code)]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    #[allow(dead_code)]
    pub fn inbound_state(&self) -> LoopState {
        self.inbound.state()
    }

    /// Whether the session can still send
    pub fn is_open(&self) -> bool {
        self.connection.state() == ConnectionState::Open
    }

    /// Send `text` tagged with the display name.
    ///
    /// On failure the connection is closed, which also stops the inbound
    /// loop; the error is returned for the caller to report. Nothing is
    /// retried.
    pub fn send(&self, text: &str) -> Result<()> {
        let line = Message::new(self.display_name.as_str(), text).to_string();
        match self.connection.send_line(&line) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Failed to send message: {}", e);
                // A message with a line break never reached the socket
                if !matches!(e, ConnectionError::Send(LineError::EmbeddedNewline)) {
                    self.connection.close_fully();
                }
                Err(e.into())
            }
        }
    }

    /// Close the session from the local side.
    ///
    /// Safe to call repeatedly and while the inbound loop is mid-read.
    pub fn request_shutdown(&self) {
        info!("Shutdown requested");
        self.connection.close_outbound();
        self.connection.close_fully();
    }

    /// Deliver pending inbound events to `sink`.
    ///
    /// Returns `false` once the end of the session has been delivered.
    pub fn process_events<S: DisplaySink + ?Sized>(&mut self, sink: &mut S) -> bool {
        while !self.ended {
            match self.events.try_recv() {
                Ok(InboundEvent::Line(line)) => sink.on_incoming_line(&line),
                Ok(InboundEvent::Ended(reason)) => {
                    self.ended = true;
                    sink.on_session_ended(&reason);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Inbound loop exited without an end event");
                    self.ended = true;
                    sink.on_session_ended(&EndReason::Local);
                }
            }
        }
        !self.ended
    }

    /// Block until the inbound loop has stopped
    pub fn wait_stopped(&mut self) {
        self.inbound.join();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.request_shutdown();
        self.inbound.join();
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['\n', '\r']) {
        return Err(SessionError::InvalidName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct RecordingSink {
        lines: Vec<String>,
        ended: Vec<EndReason>,
    }

    impl DisplaySink for RecordingSink {
        fn on_incoming_line(&mut self, line: &str) {
            self.lines.push(line.to_string());
        }

        fn on_session_ended(&mut self, reason: &EndReason) {
            self.ended.push(reason.clone());
        }
    }

    fn stub_server() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    fn connect(name: &str) -> (Session, TcpStream) {
        let (listener, port) = stub_server();
        let session = Session::connect(name, "127.0.0.1", port).unwrap();
        let (peer, _) = listener.accept().unwrap();
        (session, peer)
    }

    /// Pump events until the session ends or the deadline passes
    fn pump_until_ended(session: &mut Session, sink: &mut RecordingSink) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while session.process_events(sink) {
            assert!(Instant::now() < deadline, "session did not end");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_send_tags_display_name() {
        let (session, peer) = connect("alice");
        let mut peer = BufReader::new(peer);

        for text in ["hello", "", "  spaced  ", "[x]: nested"] {
            session.send(text).unwrap();
            let mut line = String::new();
            peer.read_line(&mut line).unwrap();
            assert_eq!(line, format!("[alice]: {}\n", text));
        }
    }

    #[test]
    fn test_incoming_line_delivered_once() {
        let (mut session, mut peer) = connect("alice");
        peer.write_all(b"[bob]: hi\n").unwrap();
        drop(peer);

        let mut sink = RecordingSink::default();
        pump_until_ended(&mut session, &mut sink);

        assert_eq!(sink.lines, vec!["[bob]: hi"]);
        assert_eq!(sink.ended, vec![EndReason::Remote]);
    }

    #[test]
    fn test_incoming_lines_keep_order() {
        let (mut session, mut peer) = connect("alice");
        let expected: Vec<String> = (0..200).map(|i| format!("[bob]: message {}", i)).collect();
        for line in &expected {
            peer.write_all(line.as_bytes()).unwrap();
            peer.write_all(b"\n").unwrap();
        }
        drop(peer);

        let mut sink = RecordingSink::default();
        pump_until_ended(&mut session, &mut sink);
        assert_eq!(sink.lines, expected);
    }

    #[test]
    fn test_request_shutdown_stops_everything() {
        let (mut session, _peer) = connect("alice");
        assert_eq!(session.inbound_state(), LoopState::Running);

        session.request_shutdown();
        assert_eq!(session.connection_state(), ConnectionState::Closed);

        session.wait_stopped();
        assert_eq!(session.inbound_state(), LoopState::Stopped);

        // Second request is harmless
        session.request_shutdown();
        assert_eq!(session.connection_state(), ConnectionState::Closed);

        let mut sink = RecordingSink::default();
        assert!(!session.process_events(&mut sink));
        assert_eq!(sink.ended, vec![EndReason::Local]);
        assert!(sink.lines.is_empty());
        // End is only delivered once
        assert!(!session.process_events(&mut sink));
        assert_eq!(sink.ended.len(), 1);
    }

    #[test]
    fn test_shutdown_racing_remote_close() {
        for _ in 0..20 {
            let (mut session, peer) = connect("alice");
            drop(peer);
            session.request_shutdown();
            session.wait_stopped();

            assert_eq!(session.connection_state(), ConnectionState::Closed);
            assert_eq!(session.inbound_state(), LoopState::Stopped);

            let mut sink = RecordingSink::default();
            assert!(!session.process_events(&mut sink));
            assert_eq!(sink.ended.len(), 1);
        }
    }

    #[test]
    fn test_remote_close_without_local_request() {
        let (mut session, peer) = connect("alice");
        drop(peer);

        let mut sink = RecordingSink::default();
        pump_until_ended(&mut session, &mut sink);
        session.wait_stopped();

        assert_eq!(sink.ended, vec![EndReason::Remote]);
        assert_eq!(session.inbound_state(), LoopState::Stopped);
        assert_eq!(session.connection_state(), ConnectionState::Closed);
        assert!(!session.is_open());
    }

    #[test]
    fn test_send_after_shutdown_fails() {
        let (session, _peer) = connect("alice");
        session.request_shutdown();
        assert!(matches!(
            session.send("too late"),
            Err(SessionError::Connection(ConnectionError::Closed))
        ));
    }

    #[test]
    fn test_send_failure_closes_session() {
        let (mut session, _peer) = connect("alice");
        session.connection.close_outbound();
        assert_eq!(session.connection_state(), ConnectionState::HalfClosed);

        assert!(session.send("lost").is_err());
        assert_eq!(session.connection_state(), ConnectionState::Closed);

        session.wait_stopped();
        assert_eq!(session.inbound_state(), LoopState::Stopped);

        let mut sink = RecordingSink::default();
        assert!(!session.process_events(&mut sink));
        assert!(!session.process_events(&mut sink));
        assert_eq!(sink.ended, vec![EndReason::Local]);
        assert!(sink.lines.is_empty());
    }

    #[test]
    fn test_bad_bytes_do_not_end_session() {
        let (mut session, mut peer) = connect("alice");
        peer.write_all(b"[eve]: caf\xe9\n[bob]: still here\n").unwrap();

        let mut sink = RecordingSink::default();
        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.lines.len() < 2 {
            assert!(session.process_events(&mut sink), "session ended early");
            assert!(Instant::now() < deadline, "lines not delivered");
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(sink.lines, vec!["[eve]: caf\u{FFFD}", "[bob]: still here"]);
        assert!(sink.ended.is_empty());
        assert!(session.is_open());
    }

    #[test]
    fn test_send_with_line_break_is_rejected() {
        let (session, _peer) = connect("alice");
        assert!(session.send("two\nlines").is_err());
        // Nothing hit the wire, so the session stays usable
        assert!(session.is_open());
        session.send("one line").unwrap();
    }

    #[test]
    fn test_invalid_display_name() {
        let (_listener, port) = stub_server();
        assert!(matches!(
            Session::connect("", "127.0.0.1", port),
            Err(SessionError::InvalidName)
        ));
        assert!(matches!(
            Session::connect("a\nb", "127.0.0.1", port),
            Err(SessionError::InvalidName)
        ));
    }

    #[test]
    fn test_connect_failure_is_reported() {
        let port = {
            let (listener, port) = stub_server();
            drop(listener);
            port
        };
        assert!(matches!(
            Session::connect("alice", "127.0.0.1", port),
            Err(SessionError::Connection(ConnectionError::Connect { .. }))
        ));
    }

    #[test]
    fn test_drop_joins_inbound_loop() {
        let (session, mut peer) = connect("alice");
        drop(session);

        // Peer observes the close
        let mut buf = [0u8; 8];
        assert_eq!(std::io::Read::read(&mut peer, &mut buf).unwrap(), 0);
    }
}
