use std::path::PathBuf;

use crate::app::{Model, ToastLevel};
use crate::document::Cursor;
use crate::editor::Direction;
use crate::sync::Notice;

/// All possible events and actions in the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Editing
    /// Type a character at the cursor
    InsertChar(char),
    /// Delete before the cursor
    Backspace,
    /// Delete under the cursor
    DeleteForward,
    /// Split the line at the cursor
    SplitLine,

    // Navigation
    MoveCursor(Direction),
    MoveHome,
    MoveEnd,
    /// Move up one screen
    PageUp,
    /// Move down one screen
    PageDown,
    /// Place the cursor at a document position (mouse click)
    MoveTo(Cursor),

    // Session
    /// Write the document to the save path
    Save,
    /// Open the save-as prompt
    SaveAs,
    /// Type into the save-as prompt
    PromptInput(char),
    /// Delete the last prompt character
    PromptBackspace,
    /// Accept the prompt and save
    PromptConfirm,
    /// Close the prompt without saving
    PromptCancel,
    /// Replace the shared document with an empty one
    NewDocument,
    /// A background task reported something
    Notice(Notice),

    // Window
    /// Toggle help overlay
    ToggleHelp,
    /// Hide help overlay
    HideHelp,
    /// Terminal resized
    Resize(u16, u16),
    /// Quit the application
    Quit,
}

/// Apply `msg` to the model.
///
/// Editing messages are forwarded to the session engine, which owns the
/// document. File I/O happens in the side-effect handler, not here.
pub fn update(mut model: Model, msg: Message) -> Model {
    match msg {
        Message::InsertChar(ch) => model.engine.type_char(ch),
        Message::Backspace => model.engine.backspace(),
        Message::DeleteForward => model.engine.delete_forward(),
        Message::SplitLine => model.engine.split_line(),

        Message::MoveCursor(direction) => model.engine.move_cursor(direction),
        Message::MoveHome => model.engine.move_home(),
        Message::MoveEnd => model.engine.move_end(),
        Message::PageUp | Message::PageDown => {
            let direction = if msg == Message::PageUp {
                Direction::Up
            } else {
                Direction::Down
            };
            for _ in 0..model.viewport.height().max(1) {
                model.engine.move_cursor(direction);
            }
        }
        Message::MoveTo(target) => model.engine.move_to(target),

        Message::Save => {}
        Message::SaveAs => {
            model.save_prompt = Some(model.save_path.display().to_string());
        }
        Message::PromptInput(ch) => {
            if let Some(prompt) = &mut model.save_prompt {
                prompt.push(ch);
            }
        }
        Message::PromptBackspace => {
            if let Some(prompt) = &mut model.save_prompt {
                prompt.pop();
            }
        }
        Message::PromptConfirm => {
            // An empty name keeps the prompt open.
            if let Some(name) = model.save_prompt.take_if(|name| !name.trim().is_empty()) {
                model.save_path = PathBuf::from(name.trim());
            }
        }
        Message::PromptCancel => model.save_prompt = None,
        Message::NewDocument => {
            model.engine.request_new_document(String::new());
            model.show_toast(ToastLevel::Info, "Starting a new document");
        }
        Message::Notice(Notice::PublishFailed(err)) => {
            model.show_toast(ToastLevel::Warning, format!("Edits not sent: {err}"));
        }

        Message::ToggleHelp => model.help_visible = !model.help_visible,
        Message::HideHelp => model.help_visible = false,
        Message::Resize(width, height) => model.resize(width, height),
        Message::Quit => model.should_quit = true,
    }
    model
}
