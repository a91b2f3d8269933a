use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{Message, Model};
use crate::document::Cursor;
use crate::editor::Direction;

pub(super) fn handle_event(event: &Event, model: &Model) -> Option<Message> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(*key, model),
        Event::Mouse(mouse) => handle_mouse(*mouse, model),
        Event::Resize(width, height) => Some(Message::Resize(*width, *height)),
        _ => None,
    }
}

pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
    if model.help_visible {
        return Some(Message::HideHelp);
    }
    if model.save_prompt.is_some() {
        return handle_prompt_key(key);
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c' | 'x' | 'q') => Some(Message::Quit),
            KeyCode::Char('s') => Some(Message::Save),
            KeyCode::Char('a') => Some(Message::SaveAs),
            KeyCode::Char('n') => Some(Message::NewDocument),
            KeyCode::Home => Some(Message::MoveTo(Cursor::at(0, 0))),
            KeyCode::End => Some(Message::MoveTo(Cursor::at(usize::MAX, usize::MAX))),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::ALT) => {
            Some(Message::InsertChar(c))
        }
        KeyCode::Enter => Some(Message::SplitLine),
        KeyCode::Backspace => Some(Message::Backspace),
        KeyCode::Delete => Some(Message::DeleteForward),

        KeyCode::Left => Some(Message::MoveCursor(Direction::Left)),
        KeyCode::Right => Some(Message::MoveCursor(Direction::Right)),
        KeyCode::Up => Some(Message::MoveCursor(Direction::Up)),
        KeyCode::Down => Some(Message::MoveCursor(Direction::Down)),
        KeyCode::Home => Some(Message::MoveHome),
        KeyCode::End => Some(Message::MoveEnd),
        KeyCode::PageUp => Some(Message::PageUp),
        KeyCode::PageDown => Some(Message::PageDown),

        KeyCode::F(1) => Some(Message::ToggleHelp),
        _ => None,
    }
}

fn handle_prompt_key(key: KeyEvent) -> Option<Message> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Message::PromptCancel)
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Message::PromptInput(c))
        }
        KeyCode::Backspace => Some(Message::PromptBackspace),
        KeyCode::Enter => Some(Message::PromptConfirm),
        KeyCode::Esc => Some(Message::PromptCancel),
        _ => None,
    }
}

pub(super) fn handle_mouse(mouse: MouseEvent, model: &Model) -> Option<Message> {
    if model.help_visible || model.save_prompt.is_some() {
        return None;
    }
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let row = usize::from(mouse.row);
            if row >= usize::from(model.viewport.height()) {
                return None;
            }
            let lines = model.engine.rendered_lines();
            let y = model.viewport.offset() + row;
            let line = lines.get(y)?;
            let gutter = crate::ui::gutter_width(lines.len());
            let col = usize::from(mouse.column.checked_sub(gutter)?) + model.viewport.column();
            Some(Message::MoveTo(Cursor::at(crate::ui::byte_offset(line, col), y)))
        }
        MouseEventKind::ScrollUp => Some(Message::MoveCursor(Direction::Up)),
        MouseEventKind::ScrollDown => Some(Message::MoveCursor(Direction::Down)),
        _ => None,
    }
}
