use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::document::Cursor;
use crate::sync::Engine;
use crate::ui::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// Everything the view needs from the engine, taken under one lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub lines: Vec<Vec<u8>>,
    pub cursor: Cursor,
    pub peers: Vec<(String, Cursor)>,
    pub editable: bool,
}

/// The complete application state.
///
/// The document itself lives in the session engine; the model only holds
/// what the terminal front-end adds on top.
pub struct Model {
    /// Handle on the shared session state
    pub engine: Engine,
    /// Code other participants use to join
    pub session_code: String,
    /// Where Ctrl-S writes the document
    pub save_path: PathBuf,
    /// File name being typed into the save-as prompt
    pub save_prompt: Option<String>,
    /// Viewport over the text area
    pub viewport: Viewport,
    /// Terminal size in cells
    pub terminal_size: (u16, u16),
    /// Global config path shown in help
    pub config_global_path: Option<PathBuf>,
    /// Local override path shown in help
    pub config_local_path: Option<PathBuf>,
    /// Whether help overlay is visible
    pub help_visible: bool,
    /// Whether the app should quit
    pub should_quit: bool,
    toast: Option<Toast>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("session_code", &self.session_code)
            .field("save_path", &self.save_path)
            .field("save_prompt", &self.save_prompt)
            .field("viewport", &self.viewport)
            .field("help_visible", &self.help_visible)
            .field("should_quit", &self.should_quit)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub fn new(
        engine: Engine,
        session_code: impl Into<String>,
        save_path: PathBuf,
        terminal_size: (u16, u16),
    ) -> Self {
        let (width, height) = terminal_size;
        Self {
            engine,
            session_code: session_code.into(),
            save_path,
            save_prompt: None,
            viewport: Viewport::new(width, height.saturating_sub(1), 1),
            terminal_size,
            config_global_path: None,
            config_local_path: None,
            help_visible: false,
            should_quit: false,
            toast: None,
        }
    }

    /// Read the engine once and scroll so the local cursor stays visible.
    pub fn snapshot(&mut self) -> Snapshot {
        let snapshot = self.engine.with(|state| Snapshot {
            lines: state.rendered_lines(),
            cursor: state.local_cursor(),
            peers: state.remote_cursors(),
            editable: state.is_editable(),
        });

        let gutter = crate::ui::gutter_width(snapshot.lines.len());
        let (width, height) = self.terminal_size;
        let footer = 1 + u16::from(self.toast.is_some());
        self.viewport.resize(
            width.saturating_sub(gutter).max(1),
            height.saturating_sub(footer),
        );
        self.viewport.set_total_lines(snapshot.lines.len());
        let row = snapshot.cursor.y.min(snapshot.lines.len().saturating_sub(1));
        let col = snapshot
            .lines
            .get(row)
            .map_or(0, |line| crate::ui::display_column(line, snapshot.cursor.x));
        self.viewport.follow(row, col);
        snapshot
    }

    pub(super) const fn resize(&mut self, width: u16, height: u16) {
        self.terminal_size = (width, height);
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }
}
