//! Chat message formatting
//!
//! A message only exists on the wire as `[sender]: text`.

use std::fmt;

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: String,
    pub text: String,
}

impl Message {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
        }
    }

    /// Split a received line back into sender and text.
    ///
    /// Returns `None` for lines that don't follow the `[sender]: text`
    /// shape (server banners, other clients' free-form output).
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('[')?;
        let (sender, text) = rest.split_once("]: ")?;
        if sender.is_empty() {
            return None;
        }
        Some(Self::new(sender, text))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.sender, self.text)
    }
}
