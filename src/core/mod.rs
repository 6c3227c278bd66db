//! Core chat session components.
//!
//! This module contains everything that touches the network:
//!
//! - **line**: Line reader/writer for the newline-delimited wire format
//! - **message**: `[sender]: text` formatting
//! - **connection**: TCP socket with half-close and idempotent full close
//! - **inbound**: Background thread reading lines from the server
//! - **session**: Display name + connection, shutdown sequencing
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── Connection (socket + LineWriter, close state)
//! └── InboundLoop (thread owning the LineReader)
//!     └── mpsc channel ──> Session::process_events ──> DisplaySink
//! ```

pub mod connection;
pub mod inbound;
pub mod line;
pub mod message;
pub mod session;
