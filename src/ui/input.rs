//! Single-line input field
//!
//! The text the user is typing before it is submitted to the session.

use unicode_width::UnicodeWidthChar;

/// Editable line with a cursor
#[derive(Debug, Default)]
pub struct InputField {
    chars: Vec<char>,
    /// Cursor position as a char index, `0..=chars.len()`
    cursor: usize,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Replace the contents, cursor at the end
    pub fn set(&mut self, text: &str) {
        self.chars = text.chars().collect();
        self.cursor = self.chars.len();
    }

    /// Take the contents for submission, leaving the field empty
    pub fn take(&mut self) -> String {
        let text = self.text();
        self.chars.clear();
        self.cursor = 0;
        text
    }

    pub fn insert_char(&mut self, ch: char) {
        // A message is a single line
        let ch = if ch == '\n' || ch == '\r' { ' ' } else { ch };
        if ch.is_control() {
            return;
        }
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
    }

    /// Insert pasted text; line breaks become spaces
    pub fn insert_str(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n");
        for ch in text.chars() {
            self.insert_char(ch);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.chars.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.chars.len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.chars.len();
    }

    /// The part of the text that fits in `width` columns, and the cursor's
    /// column within it. Scrolls horizontally to keep the cursor visible.
    pub fn visible(&self, width: usize) -> (String, usize) {
        if width == 0 {
            return (String::new(), 0);
        }

        // Walk back from the cursor until the line is full
        let mut start = self.cursor;
        let mut used = 0;
        while start > 0 {
            let w = char_width(self.chars[start - 1]);
            // Leave one column for the cursor itself
            if used + w >= width {
                break;
            }
            used += w;
            start -= 1;
        }

        let cursor_col = used;
        let mut visible = String::new();
        let mut total = 0;
        for &ch in &self.chars[start..] {
            let w = char_width(ch);
            if total + w > width {
                break;
            }
            visible.push(ch);
            total += w;
        }

        (visible, cursor_col)
    }
}

fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}
