use std::io::stdout;
use std::time::Duration;
use std::time::Instant;

use anyhow::{Context, Result};
use crossterm::event;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::{App, Message, Model, update};
use crate::sync::Session;

use super::effects::handle_message_side_effects;
use super::input::handle_event;

/// How long to wait for input before checking the session for changes.
const POLL_INTERVAL: Duration = Duration::from_millis(30);

impl App {
    /// Run the main event loop until the user quits, then close the session.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal initialization or the event loop
    /// encounters an I/O failure.
    pub fn run(self) -> Result<()> {
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal; sync-edit requires an interactive terminal")?;
        let size = terminal.size()?;

        let mut model = Model::new(
            self.session.engine().clone(),
            self.session_code.clone(),
            self.save_path.clone(),
            (size.width, size.height),
        );
        model
            .config_global_path
            .clone_from(&self.config_global_path);
        model.config_local_path.clone_from(&self.config_local_path);

        let _ = execute!(stdout(), EnableMouseCapture);
        let result = Self::event_loop(&mut terminal, model, &self.session);

        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();
        self.session.shutdown();

        result
    }

    fn event_loop(
        terminal: &mut DefaultTerminal,
        mut model: Model,
        session: &Session,
    ) -> Result<()> {
        let mut needs_render = true;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            while let Some(notice) = session.try_notice() {
                model = update(model, Message::Notice(notice));
                needs_render = true;
            }

            // Remote operations, cursor moves and echoes all mark the engine dirty.
            if model.engine.take_dirty() {
                needs_render = true;
            }

            if needs_render {
                let snapshot = model.snapshot();
                terminal.draw(|frame| crate::ui::render(&model, &snapshot, frame))?;
                needs_render = false;
            }

            if event::poll(POLL_INTERVAL)? {
                // Drain key repeat bursts before the next render.
                loop {
                    if let Some(msg) = handle_event(&event::read()?, &model) {
                        tracing::trace!(?msg, "message");
                        let side_msg = msg.clone();
                        model = update(model, msg);
                        handle_message_side_effects(&mut model, &side_msg);
                        needs_render = true;
                    }
                    if model.should_quit || !event::poll(Duration::ZERO)? {
                        break;
                    }
                }
            }

            if model.should_quit {
                break;
            }
        }
        Ok(())
    }
}
