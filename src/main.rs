//! sync-edit - collaborative plain-text editing in the terminal.
//!
//! # Usage
//!
//! ```bash
//! sync-edit notes.txt            # start a session seeded from notes.txt
//! sync-edit --join Qm9vYmFy      # join someone else's session
//! sync-edit --cat Qm9vYmFy       # print a session's current document
//! ```

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use syncedit::app::App;
use syncedit::config::{
    ConfigFlags, clear_config_flags, default_name, default_sessions_dir, global_config_path,
    load_config_flags, local_override_path, parse_flag_tokens, sanitize_name, save_config_flags,
};
use syncedit::sync::{Bootstrap, Session, SessionError, SessionOptions, replay};
use syncedit::transport::{
    FileTransport, Transport, generate_client_id, generate_code, session_log_path,
};

/// Collaborative plain-text editing over a shared operation log
#[derive(Parser, Debug)]
#[command(name = "sync-edit", version, about, long_about = None)]
struct Cli {
    /// File to seed a new session with (also the Ctrl-S target)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Join an existing session
    #[arg(long, value_name = "CODE", conflicts_with = "cat")]
    join: Option<String>,

    /// Print the current document of a session and exit
    #[arg(long, value_name = "CODE", conflicts_with = "file")]
    cat: Option<String>,

    /// Directory holding session logs
    #[arg(long, value_name = "PATH")]
    sessions_dir: Option<PathBuf>,

    /// Milliseconds between periodic flushes of pending edits
    #[arg(long, value_name = "MS")]
    flush_interval: Option<u64>,

    /// Display name shown to other participants
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Write logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

/// Route logs to `log_file` when given. Otherwise interactive sessions log
/// nowhere, since the terminal belongs to the UI, and other commands log
/// warnings to stderr.
fn init_logging(log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };
    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if !interactive {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn open_session_log(sessions_dir: &Path, code: &str, client_id: &str) -> Result<FileTransport> {
    let path = session_log_path(sessions_dir, code);
    if !path.is_file() {
        anyhow::bail!(SessionError::NotFound(code.to_string()));
    }
    FileTransport::open(path, client_id).context("Failed to open session log")
}

fn create_session_log(sessions_dir: &Path, code: &str, client_id: &str) -> Result<FileTransport> {
    let path = session_log_path(sessions_dir, code);
    if path.exists() {
        anyhow::bail!(SessionError::AlreadyExists(code.to_string()));
    }
    FileTransport::create(path, client_id).context("Failed to create session log")
}

/// Print the replayed document of session `code`, one line per line.
fn cat_session(sessions_dir: &Path, code: &str, client_id: &str) -> Result<()> {
    let transport = open_session_log(sessions_dir, code, client_id)?;
    let history = transport
        .history()
        .with_context(|| format!("Failed to read session {code}"))?;
    let doc = replay(history.iter().map(|delivered| &delivered.op))
        .with_context(|| format!("Session {code} has no document"))?;

    let mut out = std::io::stdout().lock();
    for line in doc.lines() {
        out.write_all(line)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    let interactive = cli.cat.is_none() && std::io::stdout().is_terminal();
    init_logging(effective.log_file.as_deref(), interactive)?;

    let sessions_dir = effective
        .sessions_dir
        .clone()
        .unwrap_or_else(default_sessions_dir);
    let name = effective
        .name
        .as_deref()
        .map_or_else(default_name, sanitize_name);
    let client_id = generate_client_id(&name);

    if let Some(code) = cli.cat.as_deref() {
        return cat_session(&sessions_dir, code, &client_id);
    }

    let options = SessionOptions {
        flush_interval: effective
            .flush_interval_ms
            .map_or(SessionOptions::default().flush_interval, Duration::from_millis),
    };

    let (code, transport, bootstrap) = if let Some(code) = cli.join.clone() {
        let transport = open_session_log(&sessions_dir, &code, &client_id)?;
        (code, transport, Bootstrap::Join)
    } else {
        let content = match cli.file.as_deref() {
            Some(path) if path.exists() => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            _ => String::new(),
        };
        let code = generate_code();
        let transport = create_session_log(&sessions_dir, &code, &client_id)?;
        (code, transport, Bootstrap::Create(content))
    };

    tracing::info!(%code, %client_id, "starting session");
    let session = Session::start(Arc::new(transport), bootstrap, options)
        .with_context(|| format!("Failed to start session {code}"))?;

    let save_path = cli
        .file
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{code}.txt")));
    let app = App::new(session, code).with_save_path(save_path).with_config_paths(
        Some(global_path),
        if local_path.exists() {
            Some(local_path)
        } else {
            None
        },
    );

    app.run().context("Application error")
}
