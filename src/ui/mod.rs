//! User interface for the chat window.
//!
//! This module provides the collaborators around the core session:
//!
//! - **transcript**: Received lines and notices (the display sink)
//! - **input**: Single-line editor (the input source)
//! - **renderer**: crossterm drawing of title bar, transcript and input line
//! - **window**: Controller that owns the session and routes UI events
//!
//! Lines from the server reach the transcript only through
//! `Session::process_events`, called from the window's event loop.

pub mod input;
pub mod renderer;
pub mod transcript;
pub mod window;

pub use renderer::Renderer;
pub use window::ChatWindow;
