//! Sent-message history for linechat
//!
//! Keeps the messages typed this run so Up/Down can recall them.
//! Messages are never written to disk.

use std::collections::VecDeque;

/// Recall buffer for sent messages
pub struct SentHistory {
    /// Entries, newest last
    entries: VecDeque<String>,
    /// Maximum entries
    max_entries: usize,
    /// Position while browsing; `None` means editing a fresh line
    cursor: Option<usize>,
    /// Text that was in the input field when browsing started
    draft: String,
}

impl SentHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            cursor: None,
            draft: String::new(),
        }
    }

    /// Record a sent message and stop browsing
    pub fn add(&mut self, text: &str) {
        self.cursor = None;
        self.draft.clear();

        if text.trim().is_empty() || self.max_entries == 0 {
            return;
        }

        // Skip if same as last message (dedup consecutive)
        if self.entries.back().map(String::as_str) == Some(text) {
            return;
        }

        self.entries.push_back(text.to_string());
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// Step back to an older entry.
    ///
    /// `current` is the input field's text, remembered when browsing starts
    /// so that stepping forward past the newest entry restores it.
    pub fn older(&mut self, current: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }

        let next = match self.cursor {
            None => {
                self.draft = current.to_string();
                self.entries.len() - 1
            }
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.cursor = Some(next);
        self.entries.get(next).map(String::as_str)
    }

    /// Step forward to a newer entry, ending at the saved draft
    pub fn newer(&mut self) -> Option<&str> {
        let i = self.cursor?;
        if i + 1 < self.entries.len() {
            self.cursor = Some(i + 1);
            self.entries.get(i + 1).map(String::as_str)
        } else {
            self.cursor = None;
            Some(self.draft.as_str())
        }
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
