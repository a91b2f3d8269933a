use std::path::Path;

use crate::app::{Message, Model, ToastLevel};

/// Perform the I/O a message asks for after `update` has run.
pub(super) fn handle_message_side_effects(model: &mut Model, msg: &Message) {
    let saving = match msg {
        Message::Save => true,
        Message::PromptConfirm => model.save_prompt.is_none(),
        _ => false,
    };
    if saving {
        let path = model.save_path.clone();
        match save_document(model, &path) {
            Ok(bytes) => {
                tracing::info!(path = %path.display(), bytes, "document saved");
                model.show_toast(ToastLevel::Info, format!("Saved {}", path.display()));
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "save failed");
                model.show_toast(ToastLevel::Error, format!("Save failed: {err}"));
            }
        }
    }
}

/// Write the canonical document to `path`, returning the byte count.
pub(super) fn save_document(model: &Model, path: &Path) -> std::io::Result<usize> {
    let text = model.engine.document_text();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &text)?;
    Ok(text.len())
}
