//! Terminal front-end and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The front-end state around a session engine
//! - [`Message`]: All possible events and actions
//! - [`update`]: State transitions, forwarding edits to the engine
//! - [`App::run`]: Main event loop with rendering

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{Model, Snapshot, ToastLevel};
pub use update::{Message, update};

use std::path::PathBuf;

use crate::sync::Session;

/// Main application struct that owns the session and runs the event loop.
pub struct App {
    session: Session,
    session_code: String,
    save_path: PathBuf,
    config_global_path: Option<PathBuf>,
    config_local_path: Option<PathBuf>,
}

impl App {
    /// Create an application over a started session.
    ///
    /// Ctrl-S saves to `<code>.txt` in the working directory unless
    /// [`App::with_save_path`] says otherwise.
    pub fn new(session: Session, session_code: impl Into<String>) -> Self {
        let session_code = session_code.into();
        Self {
            save_path: PathBuf::from(format!("{session_code}.txt")),
            session,
            session_code,
            config_global_path: None,
            config_local_path: None,
        }
    }

    /// Set where Ctrl-S writes the document.
    #[must_use]
    pub fn with_save_path(mut self, path: PathBuf) -> Self {
        self.save_path = path;
        self
    }

    /// Set config paths to show in help.
    #[must_use]
    pub fn with_config_paths(
        mut self,
        global_path: Option<PathBuf>,
        local_path: Option<PathBuf>,
    ) -> Self {
        self.config_global_path = global_path;
        self.config_local_path = local_path;
        self
    }
}
