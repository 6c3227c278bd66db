//! Configuration and color scheme management for linechat.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.linechat/config.toml`
//! - Built-in color schemes for the chat window
//!
//! # Configuration File
//!
//! ```toml
//! # Defaults for the command line (optional)
//! name = "alice"
//! host = "chat.example.org"
//! port = 4444
//!
//! # Color scheme: classic, dark, plain
//! color_scheme = "classic"
//!
//! # Sent messages kept for Up/Down recall
//! history_limit = 100
//!
//! [window]
//! title_bar = true
//! timestamps = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Port used by the reference chat server
pub const DEFAULT_PORT: u16 = 4444;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default display name
    pub name: Option<String>,
    /// Default server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Color scheme name
    pub color_scheme: String,
    /// Number of sent messages remembered for recall
    pub history_limit: usize,
    /// Window settings
    pub window: WindowConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: None,
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            color_scheme: "classic".to_string(),
            history_limit: 100,
            window: WindowConfig::default(),
        }
    }
}

/// Window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Show the `linechat: [name]` title bar
    pub title_bar: bool,
    /// Prefix received lines with their local arrival time
    pub timestamps: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title_bar: true,
            timestamps: false,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from `~/.linechat/config.toml`.
    ///
    /// Falls back to defaults when the file is missing or malformed.
    pub fn load(path: Option<&Path>) -> Self {
        let explicit = path.is_some();
        let path = match path.map(Path::to_path_buf).or_else(Self::get_config_path) {
            Some(p) => p,
            None => return Self::default(),
        };

        if !path.exists() {
            if explicit {
                warn!("Config {} not found, using defaults", path.display());
            }
            return Self::default();
        }

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read config {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::parse(&content) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        data_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get the color scheme
    pub fn get_color_scheme(&self) -> ColorScheme {
        ColorScheme::by_name(&self.color_scheme)
    }
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// Color scheme definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub name: String,

    // Title bar
    pub title_bg: Color,
    pub title_fg: Color,

    // Transcript
    pub transcript_bg: Color,
    pub transcript_fg: Color,
    /// Lines sent under our own display name
    pub own_fg: Color,
    /// Notices (errors, connection closed)
    pub notice_fg: Color,

    // Input line
    pub input_bg: Color,
    pub input_fg: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::classic()
    }
}

impl ColorScheme {
    /// Light green background with dark green text
    pub fn classic() -> Self {
        Self {
            name: "classic".to_string(),
            title_bg: Color::new(0, 128, 0),
            title_fg: Color::new(255, 255, 255),
            transcript_bg: Color::new(159, 255, 159),
            transcript_fg: Color::new(0, 128, 0),
            own_fg: Color::new(0, 80, 0),
            notice_fg: Color::new(160, 0, 0),
            input_bg: Color::new(255, 255, 255),
            input_fg: Color::new(0, 0, 0),
        }
    }

    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            title_bg: Color::new(36, 40, 59),
            title_fg: Color::new(192, 202, 245),
            transcript_bg: Color::new(26, 27, 38),
            transcript_fg: Color::new(169, 177, 214),
            own_fg: Color::new(122, 162, 247),
            notice_fg: Color::new(247, 118, 142),
            input_bg: Color::new(36, 40, 59),
            input_fg: Color::new(192, 202, 245),
        }
    }

    /// Black and white
    pub fn plain() -> Self {
        Self {
            name: "plain".to_string(),
            title_bg: Color::new(255, 255, 255),
            title_fg: Color::new(0, 0, 0),
            transcript_bg: Color::new(0, 0, 0),
            transcript_fg: Color::new(229, 229, 229),
            own_fg: Color::new(255, 255, 255),
            notice_fg: Color::new(255, 255, 255),
            input_bg: Color::new(0, 0, 0),
            input_fg: Color::new(255, 255, 255),
        }
    }

    /// Get scheme by name
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "dark" => Self::dark(),
            "plain" | "mono" => Self::plain(),
            _ => Self::classic(),
        }
    }
}

/// `~/.linechat`, created on first use
pub fn data_dir() -> Option<PathBuf> {
    ensure_dir(home_dir()?.join(".linechat"))
}

/// `dir`, created if missing, or `None` if it cannot be created.
///
/// Runs before logging is set up, so failures go to stderr.
fn ensure_dir(dir: PathBuf) -> Option<PathBuf> {
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(&dir) {
            eprintln!("linechat: cannot create {}: {}", dir.display(), e);
            return None;
        }
    }
    Some(dir)
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, "localhost");
    }

    #[test]
    fn test_partial_config() {
        let config = Config::parse(
            r#"
            name = "alice"
            port = 5555

            [window]
            timestamps = true
            "#,
        )
        .unwrap();

        assert_eq!(config.name.as_deref(), Some("alice"));
        assert_eq!(config.port, 5555);
        assert_eq!(config.host, "localhost");
        assert!(config.window.timestamps);
        assert!(config.window.title_bar);
    }

    #[test]
    fn test_malformed_config_is_error() {
        assert!(Config::parse("port = \"not a number\"").is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Config::load(Some(Path::new("/nonexistent/linechat/config.toml")));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_ensure_dir() {
        let base = std::env::temp_dir().join(format!("linechat-test-{}", std::process::id()));
        let dir = base.join("data");
        assert_eq!(ensure_dir(dir.clone()), Some(dir.clone()));
        assert!(dir.is_dir());

        // A regular file in the way
        let blocker = base.join("file");
        fs::write(&blocker, b"x").unwrap();
        assert_eq!(ensure_dir(blocker.join("data")), None);

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_scheme_lookup() {
        assert_eq!(ColorScheme::by_name("DARK").name, "dark");
        assert_eq!(ColorScheme::by_name("mono").name, "plain");
        assert_eq!(ColorScheme::by_name("unknown").name, "classic");
    }
}
