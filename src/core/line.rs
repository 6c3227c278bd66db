//! Line codec for the chat wire protocol
//!
//! Every message on the wire is a single UTF-8 line terminated by `\n`.
//! `LineReader` turns a byte stream into lines, `LineWriter` does the reverse.

use std::io::{self, BufRead, BufReader, Read, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LineError {
    #[error("Failed to read line: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write line: {0}")]
    Write(#[source] io::Error),

    #[error("Line contains an embedded line break")]
    EmbeddedNewline,
}

pub type Result<T> = std::result::Result<T, LineError>;

/// Result of a single blocking read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// A complete line, without its terminator
    Line(String),
    /// No further bytes will arrive
    EndOfStream,
}

/// Blocking line reader over a byte stream
pub struct LineReader<R> {
    inner: BufReader<R>,
    /// Set once the stream has ended; the reader never restarts
    finished: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            finished: false,
        }
    }

    /// Block until the next full line or the end of the stream.
    ///
    /// A final fragment that is not newline-terminated is still returned as
    /// a line. A trailing `\r` is dropped so CRLF peers read the same.
    /// Bytes that are not valid UTF-8 become U+FFFD; the stream continues.
    pub fn next_line(&mut self) -> Result<ReadLine> {
        if self.finished {
            return Ok(ReadLine::EndOfStream);
        }

        let mut buf = Vec::new();
        let n = match self.inner.read_until(b'\n', &mut buf) {
            Ok(n) => n,
            Err(e) => {
                self.finished = true;
                return Err(LineError::Read(e));
            }
        };

        if n == 0 {
            self.finished = true;
            return Ok(ReadLine::EndOfStream);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        Ok(ReadLine::Line(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Whether end-of-stream (or a read failure) has been observed
    #[allow(dead_code)]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Lines until the first end-of-stream or read error
impl<R: Read> Iterator for LineReader<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self.next_line() {
            Ok(ReadLine::Line(line)) => Some(line),
            Ok(ReadLine::EndOfStream) | Err(_) => None,
        }
    }
}

impl<R: Read> std::iter::FusedIterator for LineReader<R> {}

/// Line writer that flushes after every line
pub struct LineWriter<W> {
    inner: W,
}

impl<W: Write> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write `text` followed by `\n` and flush before returning
    pub fn send_line(&mut self, text: &str) -> Result<()> {
        if text.contains(['\n', '\r']) {
            return Err(LineError::EmbeddedNewline);
        }

        let mut line = Vec::with_capacity(text.len() + 1);
        line.extend_from_slice(text.as_bytes());
        line.push(b'\n');

        self.inner.write_all(&line).map_err(LineError::Write)?;
        self.inner.flush().map_err(LineError::Write)
    }

    #[allow(dead_code)]
    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}
