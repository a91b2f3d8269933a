use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{Model, Snapshot, ToastLevel};
use crate::transport::display_name;

pub fn render_status_bar(model: &Model, snapshot: &Snapshot, frame: &mut Frame, area: Rect) {
    if let Some(name) = &model.save_prompt {
        let prompt = Paragraph::new(format!(" Save as: {name}  (Enter:save  Esc:cancel)"))
            .style(Style::default().bg(Color::Blue).fg(Color::White));
        frame.render_widget(prompt, area);
        return;
    }

    let peers = snapshot
        .peers
        .iter()
        .map(|(id, _)| display_name(id))
        .collect::<Vec<_>>();
    let peer_info = if peers.is_empty() {
        "alone".to_string()
    } else {
        format!("{} peer(s): {}", peers.len(), peers.join(", "))
    };

    let row = snapshot.cursor.y;
    let col = snapshot
        .lines
        .get(row)
        .map_or(0, |line| super::display_column(line, snapshot.cursor.x));
    let read_only = if snapshot.editable { "" } else { " [waiting]" };

    let status = format!(
        " Session: {}  {}  Ln {}, Col {}{}  F1:help  Ctrl+S:save  Ctrl+X:quit",
        model.session_code,
        peer_info,
        row + 1,
        col + 1,
        read_only
    );

    let status_bar =
        Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(status_bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    let toast = Paragraph::new(format!("{prefix} {message}")).style(style);
    frame.render_widget(toast, area);
}
