//! linechat - A terminal client for line-oriented TCP chat servers
//!
//! linechat connects to a broadcast chat server, sends every line you type
//! as `[name]: text` and shows every line the server sends back.
//!
//! # Quick Start
//!
//! ```text
//! linechat alice                   # Connect to localhost:4444 as alice
//! linechat alice chat.example.org  # Connect to another host
//! linechat -p 5555 alice           # Use a different port
//! ```
//!
//! # Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | Enter | Send the input line |
//! | Up/Down | Recall sent messages |
//! | PageUp/PageDown | Scroll the transcript |
//! | Esc, Ctrl+C, Ctrl+D | Close the window |

mod core;
mod ui;
mod history;
mod config;

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config as ChatConfig;
use crate::core::session::Session;
use crate::ui::{ChatWindow, Renderer};

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Args {
    /// Display name
    name: Option<String>,
    /// Server host
    host: Option<String>,
    /// Server port
    port: Option<u16>,
    /// Alternate config file
    config: Option<PathBuf>,
    help: bool,
    version: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("linechat {}", VERSION);
}

fn print_help() {
    eprintln!("linechat {} - A terminal client for line-oriented TCP chat servers", VERSION);
    eprintln!();
    eprintln!("Usage: linechat [OPTIONS] <NAME> [HOST]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <NAME>                Display name shown as [NAME] on each message");
    eprintln!("  [HOST]                Server host (default: from config or localhost)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -p, --port <PORT>     Server port (default: 4444)");
    eprintln!("  -c, --config <PATH>   Config file (default: ~/.linechat/config.toml)");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Enter                 Send message");
    eprintln!("  Up/Down               Recall sent messages");
    eprintln!("  PageUp/PageDown       Scroll");
    eprintln!("  Esc, Ctrl+C           Quit");
    eprintln!();
    eprintln!("Log file: ~/.linechat/linechat.log (level via RUST_LOG)");
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args, String> {
    let args: Vec<String> = args.into_iter().collect();
    let mut parsed = Args::default();
    let mut positional = Vec::new();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => parsed.help = true,
            "-v" | "--version" => parsed.version = true,
            "-p" | "--port" => {
                i += 1;
                let value = args.get(i).ok_or("Missing port argument")?;
                let port = value
                    .parse::<u16>()
                    .map_err(|_| format!("Invalid port: {}", value))?;
                parsed.port = Some(port);
            }
            "-c" | "--config" => {
                i += 1;
                let value = args.get(i).ok_or("Missing config argument")?;
                parsed.config = Some(PathBuf::from(value));
            }
            arg if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    parsed.name = positional.next();
    parsed.host = positional.next();
    if let Some(extra) = positional.next() {
        return Err(format!("Unexpected argument: {}", extra));
    }

    Ok(parsed)
}

/// Log to `~/.linechat/linechat.log`; the terminal belongs to the UI
fn init_logging() {
    let log_path = config::data_dir()
        .map(|dir| dir.join("linechat.log"))
        .unwrap_or_else(|| PathBuf::from("linechat.log"));

    // Open log file (append mode)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args(env::args()) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    if args.help {
        print_help();
        return Ok(());
    }
    if args.version {
        print_version();
        return Ok(());
    }

    init_logging();
    info!("linechat starting...");

    // Command line values override the config file
    let chat_config = ChatConfig::load(args.config.as_deref());
    let name = match args.name.or_else(|| chat_config.name.clone()) {
        Some(n) => n,
        None => {
            eprintln!("Error: a display name is required");
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };
    let host = args.host.unwrap_or_else(|| chat_config.host.clone());
    let port = args.port.unwrap_or(chat_config.port);

    info!("Connecting to {}:{} as [{}]", host, port, name);

    // No retry: a failed connect ends the run
    let session = match Session::connect(&name, &host, port) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to connect: {}", e);
            return Err(e).with_context(|| format!("could not start chat with {}:{}", host, port));
        }
    };

    let server = format!("{}:{}", host, port);
    let mut window = ChatWindow::new(
        session,
        &server,
        chat_config.history_limit,
        chat_config.window.timestamps,
    );

    let mut renderer = Renderer::new(chat_config.get_color_scheme(), chat_config.window.title_bar);
    renderer.init().context("failed to initialize terminal")?;
    let result = window.run(&mut renderer);
    renderer.cleanup()?;

    if let Err(ref e) = result {
        error!("Window loop failed: {}", e);
    }
    info!("linechat exiting");
    result
}
