//! Chat transcript
//!
//! The display side of the session: everything received, plus local notices.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use unicode_width::UnicodeWidthChar;

use crate::core::inbound::EndReason;
use crate::core::message::Message;
use crate::core::session::DisplaySink;

/// Lines kept before the oldest are dropped
const TRANSCRIPT_LIMIT: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Received from the server
    Incoming,
    /// Received from the server and sent under our own name
    Own,
    /// Generated locally (errors, connection state)
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    pub text: String,
}

/// Displayed lines, oldest first
pub struct Transcript {
    entries: VecDeque<Entry>,
    own_name: String,
    timestamps: bool,
    /// Rows scrolled up from the bottom
    scroll_offset: usize,
    /// Set when something changed since the last render
    dirty: bool,
}

impl Transcript {
    pub fn new(own_name: &str, timestamps: bool) -> Self {
        Self {
            entries: VecDeque::new(),
            own_name: own_name.to_string(),
            timestamps,
            scroll_offset: 0,
            dirty: true,
        }
    }

    /// Show a locally generated line
    pub fn notice(&mut self, text: &str) {
        self.push(EntryKind::Notice, text.to_string());
    }

    fn push(&mut self, kind: EntryKind, text: String) {
        let text = if self.timestamps {
            format!("{} {}", clock_time(&Local::now()), text)
        } else {
            text
        };

        self.entries.push_back(Entry { kind, text });
        while self.entries.len() > TRANSCRIPT_LIMIT {
            self.entries.pop_front();
        }
        self.dirty = true;
    }

    #[allow(dead_code)]
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.scroll_offset += rows;
        self.dirty = true;
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(rows);
        self.dirty = true;
    }

    /// Rows to draw in a `width` x `height` area, oldest first.
    ///
    /// Long lines are wrapped. The scroll offset is clamped so the view
    /// never runs past the first line.
    pub fn visible_rows(&mut self, width: usize, height: usize) -> Vec<(EntryKind, String)> {
        let mut rows = Vec::new();
        for entry in &self.entries {
            for row in wrap(&entry.text, width) {
                rows.push((entry.kind, row));
            }
        }

        let max_offset = rows.len().saturating_sub(height);
        self.scroll_offset = self.scroll_offset.min(max_offset);

        let end = rows.len() - self.scroll_offset;
        let start = end.saturating_sub(height);
        rows.drain(start..end).collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl DisplaySink for Transcript {
    fn on_incoming_line(&mut self, line: &str) {
        let kind = match Message::parse(line) {
            Some(msg) if msg.sender == self.own_name => EntryKind::Own,
            _ => EntryKind::Incoming,
        };
        self.push(kind, line.to_string());
    }

    fn on_session_ended(&mut self, reason: &EndReason) {
        let text = match reason {
            EndReason::Remote => "Connection closed by server".to_string(),
            EndReason::Local => "Disconnected".to_string(),
            EndReason::ReadError(e) => format!("Connection lost: {}", e),
        };
        self.notice(&text);
    }
}

/// Split `text` into rows of at most `width` columns
fn wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }

    let mut rows = vec![String::new()];
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width && used > 0 {
            rows.push(String::new());
            used = 0;
        }
        if let Some(row) = rows.last_mut() {
            row.push(ch);
        }
        used += w;
    }
    rows
}

/// `HH:MM:SS` in local time
fn clock_time(now: &DateTime<Local>) -> String {
    now.format("%H:%M:%S").to_string()
}
