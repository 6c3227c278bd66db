//! Chat window renderer using crossterm
//!
//! Draws the title bar, the transcript and the input line.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use unicode_width::UnicodeWidthStr;

use crate::config::{Color, ColorScheme};
use super::input::InputField;
use super::transcript::{EntryKind, Transcript};

/// Prompt in front of the input line
const PROMPT: &str = "> ";

/// What the title bar shows
pub struct TitleInfo<'a> {
    pub name: &'a str,
    pub status: &'a str,
}

/// Chat window renderer
pub struct Renderer {
    scheme: ColorScheme,
    title_bar: bool,
    /// Whether the terminal has been initialized
    initialized: bool,
}

impl Renderer {
    pub fn new(scheme: ColorScheme, title_bar: bool) -> Self {
        Self {
            scheme,
            title_bar,
            initialized: false,
        }
    }

    /// Initialize the terminal for rendering
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            crossterm::event::EnableBracketedPaste,
            DisableLineWrap,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;

        self.initialized = true;
        Ok(())
    }

    /// Cleanup the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let mut stdout = io::stdout();

        // Reset all attributes first
        let _ = execute!(stdout, ResetColor, SetAttribute(Attribute::Reset));
        let _ = execute!(stdout, Show, EnableLineWrap);
        let _ = execute!(stdout, crossterm::event::DisableBracketedPaste);
        let _ = execute!(stdout, LeaveAlternateScreen);
        let _ = stdout.flush();

        // Disable raw mode - this is the most important part
        terminal::disable_raw_mode()
    }

    /// Draw the whole window
    pub fn render(
        &mut self,
        title: &TitleInfo<'_>,
        transcript: &mut Transcript,
        input: &InputField,
    ) -> io::Result<()> {
        let (cols, rows) = terminal::size()?;
        let width = cols as usize;

        let stdout = io::stdout();
        let mut stdout = io::BufWriter::with_capacity(65536, stdout.lock());

        // Begin synchronized update (reduces flicker)
        write!(stdout, "\x1b[?2026h")?;
        queue!(stdout, Hide)?;

        let mut row: u16 = 0;
        if self.title_bar && rows > 2 {
            let text = format!(" linechat: [{}]  {}", title.name, title.status);
            self.draw_row(&mut stdout, row, &text, width, self.scheme.title_bg, self.scheme.title_fg)?;
            row += 1;
        }

        // Everything between the title bar and the input line
        let transcript_rows = rows.saturating_sub(row + 1) as usize;
        let lines = transcript.visible_rows(width, transcript_rows);
        let blank = transcript_rows.saturating_sub(lines.len());

        for _ in 0..blank {
            self.draw_row(&mut stdout, row, "", width, self.scheme.transcript_bg, self.scheme.transcript_fg)?;
            row += 1;
        }
        for (kind, text) in &lines {
            let fg = match kind {
                EntryKind::Incoming => self.scheme.transcript_fg,
                EntryKind::Own => self.scheme.own_fg,
                EntryKind::Notice => self.scheme.notice_fg,
            };
            self.draw_row(&mut stdout, row, text, width, self.scheme.transcript_bg, fg)?;
            row += 1;
        }

        // Input line
        let prompt_width = PROMPT.width();
        let (visible, cursor_col) = input.visible(width.saturating_sub(prompt_width));
        let text = format!("{}{}", PROMPT, visible);
        self.draw_row(&mut stdout, row, &text, width, self.scheme.input_bg, self.scheme.input_fg)?;

        let cursor_x = (prompt_width + cursor_col).min(width.saturating_sub(1)) as u16;
        queue!(stdout, ResetColor, MoveTo(cursor_x, row), Show)?;

        // End synchronized update
        write!(stdout, "\x1b[?2026l")?;
        stdout.flush()?;

        transcript.clear_dirty();
        Ok(())
    }

    /// Draw `text` on `row`, padded to the full width
    fn draw_row<W: Write>(
        &self,
        out: &mut W,
        row: u16,
        text: &str,
        width: usize,
        bg: Color,
        fg: Color,
    ) -> io::Result<()> {
        let used = text.width();
        let padding = width.saturating_sub(used);
        queue!(
            out,
            MoveTo(0, row),
            SetBackgroundColor(bg.to_crossterm()),
            SetForegroundColor(fg.to_crossterm()),
            Print(text),
            Print(" ".repeat(padding))
        )
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
