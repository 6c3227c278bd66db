//! Chat window controller
//!
//! Owns the session and the UI pieces, and turns terminal events into
//! session calls. Everything here runs on the foreground thread.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{info, warn};

use crate::core::session::Session;
use crate::history::SentHistory;
use super::input::InputField;
use super::renderer::{Renderer, TitleInfo};
use super::transcript::Transcript;

/// Rows moved per PageUp/PageDown
const PAGE_ROWS: usize = 10;

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    Continue,
    Close,
}

/// The chat window
pub struct ChatWindow {
    session: Session,
    transcript: Transcript,
    input: InputField,
    history: SentHistory,
    /// Shown in the title bar
    server: String,
    /// False once the session end has been delivered
    live: bool,
}

impl ChatWindow {
    pub fn new(session: Session, server: &str, history_limit: usize, timestamps: bool) -> Self {
        let transcript = Transcript::new(session.display_name(), timestamps);
        Self {
            session,
            transcript,
            input: InputField::new(),
            history: SentHistory::new(history_limit),
            server: server.to_string(),
            live: true,
        }
    }

    #[allow(dead_code)]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[allow(dead_code)]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Deliver whatever the inbound loop has posted since the last turn
    pub fn pump(&mut self) {
        if self.live {
            self.live = self.session.process_events(&mut self.transcript);
        }
    }

    /// Submit the input line to the session
    pub fn on_user_submit(&mut self) {
        if self.input.is_empty() {
            return;
        }
        let text = self.input.take();
        self.history.add(&text);

        if !self.session.is_open() {
            self.transcript.notice("! Not connected; message not sent");
            return;
        }

        if let Err(e) = self.session.send(&text) {
            // Not fatal: the session winds down, the window stays up
            self.transcript.notice(&format!("! {}", e));
        }
    }

    /// The user closed the window
    pub fn on_close(&mut self) -> WindowAction {
        info!("Window closed by user");
        self.session.request_shutdown();
        WindowAction::Close
    }

    pub fn handle_event(&mut self, evt: Event) -> WindowAction {
        match evt {
            Event::Key(key) => self.handle_key(key),
            Event::Paste(text) => {
                self.input.insert_str(&text);
                WindowAction::Continue
            }
            Event::Resize(cols, rows) => {
                info!("Resize: {}x{}", cols, rows);
                self.transcript.mark_all_dirty();
                WindowAction::Continue
            }
            _ => WindowAction::Continue,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> WindowAction {
        // Only process key press events
        if key.kind != KeyEventKind::Press {
            return WindowAction::Continue;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') | KeyCode::Char('d') => self.on_close(),
                _ => WindowAction::Continue,
            };
        }

        match key.code {
            KeyCode::Esc => return self.on_close(),
            KeyCode::Enter => self.on_user_submit(),
            KeyCode::Char(ch) => self.input.insert_char(ch),
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Delete => self.input.delete(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            KeyCode::Up => {
                let current = self.input.text();
                if let Some(text) = self.history.older(&current) {
                    let text = text.to_string();
                    self.input.set(&text);
                }
            }
            KeyCode::Down => {
                if let Some(text) = self.history.newer() {
                    let text = text.to_string();
                    self.input.set(&text);
                }
            }
            KeyCode::PageUp => self.transcript.scroll_up(PAGE_ROWS),
            KeyCode::PageDown => self.transcript.scroll_down(PAGE_ROWS),
            _ => {}
        }
        WindowAction::Continue
    }

    fn status(&self) -> String {
        if self.session.is_open() {
            format!("connected to {}", self.server)
        } else {
            "disconnected".to_string()
        }
    }

    /// Run the event loop until the user closes the window
    pub fn run(&mut self, renderer: &mut Renderer) -> anyhow::Result<()> {
        let poll_timeout = Duration::from_millis(10);
        let mut needs_render = true;

        loop {
            self.pump();
            if self.transcript.is_dirty() {
                needs_render = true;
            }

            if needs_render {
                let status = self.status();
                let title = TitleInfo {
                    name: self.session.display_name(),
                    status: &status,
                };
                renderer.render(&title, &mut self.transcript, &self.input)?;
                needs_render = false;
            }

            if event::poll(poll_timeout)? {
                let evt = event::read()?;
                if self.handle_event(evt) == WindowAction::Close {
                    break;
                }
                needs_render = true;
            }
        }

        // Pick up the end-of-session event for the log
        self.session.wait_stopped();
        self.pump();
        if self.live {
            warn!("Session still live after window close");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection::ConnectionState;
    use crate::core::inbound::LoopState;
    use crate::ui::transcript::EntryKind;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Instant;

    fn open_window(name: &str) -> (ChatWindow, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let session = Session::connect(name, "127.0.0.1", port).unwrap();
        let (peer, _) = listener.accept().unwrap();
        (ChatWindow::new(session, "test", 10, false), peer)
    }

    fn press(window: &mut ChatWindow, code: KeyCode) -> WindowAction {
        window.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(window: &mut ChatWindow, text: &str) {
        for ch in text.chars() {
            press(window, KeyCode::Char(ch));
        }
    }

    fn pump_until(window: &mut ChatWindow, done: impl Fn(&ChatWindow) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            window.pump();
            if done(&*window) {
                return;
            }
            assert!(Instant::now() < deadline, "condition not reached");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_enter_sends_tagged_line() {
        let (mut window, peer) = open_window("alice");
        type_text(&mut window, "hello there");
        assert_eq!(press(&mut window, KeyCode::Enter), WindowAction::Continue);

        let mut line = String::new();
        BufReader::new(peer).read_line(&mut line).unwrap();
        assert_eq!(line, "[alice]: hello there\n");
    }

    #[test]
    fn test_empty_enter_sends_nothing() {
        let (mut window, peer) = open_window("alice");
        press(&mut window, KeyCode::Enter);
        type_text(&mut window, "x");
        press(&mut window, KeyCode::Enter);

        let mut line = String::new();
        BufReader::new(peer).read_line(&mut line).unwrap();
        assert_eq!(line, "[alice]: x\n");
    }

    #[test]
    fn test_incoming_lines_reach_transcript() {
        let (mut window, mut peer) = open_window("alice");
        peer.write_all(b"[bob]: hi\n[alice]: echo\n").unwrap();

        pump_until(&mut window, |w| w.transcript().len() == 2);
        let entries: Vec<_> = window.transcript().entries().cloned().collect();
        assert_eq!(entries[0].text, "[bob]: hi");
        assert_eq!(entries[0].kind, EntryKind::Incoming);
        assert_eq!(entries[1].kind, EntryKind::Own);
    }

    #[test]
    fn test_escape_closes_session() {
        let (mut window, _peer) = open_window("alice");
        assert_eq!(press(&mut window, KeyCode::Esc), WindowAction::Close);
        assert_eq!(window.session().connection_state(), ConnectionState::Closed);

        window.session.wait_stopped();
        assert_eq!(window.session().inbound_state(), LoopState::Stopped);
    }

    #[test]
    fn test_ctrl_c_closes() {
        let (mut window, _peer) = open_window("alice");
        let action = window.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(action, WindowAction::Close);
    }

    #[test]
    fn test_remote_close_keeps_window_open() {
        let (mut window, peer) = open_window("alice");
        drop(peer);

        pump_until(&mut window, |w| !w.live);
        assert_eq!(
            window.transcript().entries().last().map(|e| e.text.as_str()),
            Some("Connection closed by server")
        );

        // Typing after the server left produces a notice, not a crash
        type_text(&mut window, "anyone?");
        press(&mut window, KeyCode::Enter);
        let last = window.transcript().entries().last().cloned().unwrap();
        assert_eq!(last.kind, EntryKind::Notice);
        assert!(last.text.starts_with('!'));
    }

    #[test]
    fn test_history_recall() {
        let (mut window, _peer) = open_window("alice");
        type_text(&mut window, "first");
        press(&mut window, KeyCode::Enter);
        type_text(&mut window, "draft");

        press(&mut window, KeyCode::Up);
        assert_eq!(window.input.text(), "first");
        press(&mut window, KeyCode::Down);
        assert_eq!(window.input.text(), "draft");
    }

    #[test]
    fn test_paste_is_single_line() {
        let (mut window, peer) = open_window("alice");
        window.handle_event(Event::Paste("a\nb".to_string()));
        press(&mut window, KeyCode::Enter);

        let mut line = String::new();
        BufReader::new(peer).read_line(&mut line).unwrap();
        assert_eq!(line, "[alice]: a b\n");
    }
}
