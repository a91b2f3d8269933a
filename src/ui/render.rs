use ratatui::prelude::*;
use ratatui::widgets::{Clear, Paragraph};

use crate::app::{Model, Snapshot};

use super::{overlays, status};

const PEER_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Magenta,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Red,
];

/// Render the complete UI.
pub fn render(model: &Model, snapshot: &Snapshot, frame: &mut Frame) {
    let area = frame.area();

    let toast_active = model.active_toast().is_some();
    let footer_rows = 1 + u16::from(toast_active);
    let text_area = Rect {
        height: area.height.saturating_sub(footer_rows),
        ..area
    };
    let toast_area = Rect {
        y: area.y + area.height.saturating_sub(2),
        height: 1,
        ..area
    };
    let status_area = Rect {
        y: area.y + area.height.saturating_sub(1),
        height: 1,
        ..area
    };

    render_document(model, snapshot, frame, text_area);
    if toast_active {
        status::render_toast_bar(model, frame, toast_area);
    }
    status::render_status_bar(model, snapshot, frame, status_area);

    if model.help_visible {
        overlays::render_help_overlay(model, frame, area);
    }
}

fn render_document(model: &Model, snapshot: &Snapshot, frame: &mut Frame, area: Rect) {
    let gutter = gutter_width(snapshot.lines.len());
    let range = model.viewport.visible_range();
    let skip = model.viewport.column();
    let width = model.viewport.width() as usize;

    let local_style = Style::default().bg(Color::White).fg(Color::Black);
    let mut content: Vec<Line> = Vec::new();
    for y in range {
        let Some(bytes) = snapshot.lines.get(y) else {
            break;
        };
        let mut marks: Vec<(usize, Style)> = snapshot
            .peers
            .iter()
            .enumerate()
            .filter(|(_, (_, cursor))| cursor.y == y)
            .map(|(idx, (_, cursor))| {
                let color = PEER_COLORS[idx % PEER_COLORS.len()];
                (
                    display_column(bytes, cursor.x),
                    Style::default().bg(color).fg(Color::Black),
                )
            })
            .collect();
        if snapshot.cursor.y == y {
            marks.push((display_column(bytes, snapshot.cursor.x), local_style));
        }

        let number = format!(
            "{:>width$} ",
            y + 1,
            width = gutter.saturating_sub(1) as usize
        );
        let mut spans = vec![Span::styled(number, Style::default().fg(Color::DarkGray))];
        spans.extend(styled_cells(&String::from_utf8_lossy(bytes), &marks, skip, width));
        content.push(Line::from(spans));
    }

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(content), area);
}

/// Split `text` into spans, highlighting the cells in `marks`.
///
/// Later marks win over earlier ones on the same column. A mark past the
/// end of the text is drawn as a highlighted space.
pub(super) fn styled_cells(
    text: &str,
    marks: &[(usize, Style)],
    skip: usize,
    width: usize,
) -> Vec<Span<'static>> {
    let style_at = |col: usize| {
        marks
            .iter()
            .rev()
            .find(|(mark, _)| *mark == col)
            .map(|(_, style)| *style)
    };

    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut col = skip;
    for ch in text.chars().skip(skip).take(width) {
        if let Some(style) = style_at(col) {
            if !plain.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut plain)));
            }
            spans.push(Span::styled(ch.to_string(), style));
        } else {
            plain.push(ch);
        }
        col += 1;
    }
    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }

    let end = text.chars().count().max(skip);
    let mut trailing: Vec<_> = marks
        .iter()
        .filter(|(mark, _)| *mark >= end && *mark < skip + width)
        .map(|(mark, _)| *mark)
        .collect();
    trailing.sort_unstable();
    trailing.dedup();
    let mut pad_from = end;
    for mark in trailing {
        if mark > pad_from {
            spans.push(Span::raw(" ".repeat(mark - pad_from)));
        }
        if let Some(style) = style_at(mark) {
            spans.push(Span::styled(" ", style));
        }
        pad_from = mark + 1;
    }
    spans
}

/// Width of the line-number gutter, including its trailing space.
pub const fn gutter_width(total_lines: usize) -> u16 {
    let digits = if total_lines < 10 {
        1
    } else if total_lines < 100 {
        2
    } else if total_lines < 1_000 {
        3
    } else if total_lines < 10_000 {
        4
    } else if total_lines < 100_000 {
        5
    } else {
        6
    };
    digits + 1
}

/// Screen column of byte offset `x` in `line`.
///
/// Counts character starts, so it agrees with lossy decoding for valid
/// UTF-8. Offsets past the end clamp to the line length.
pub fn display_column(line: &[u8], x: usize) -> usize {
    line[..x.min(line.len())]
        .iter()
        .filter(|b| (**b & 0xC0) != 0x80)
        .count()
}

/// Byte offset of screen column `col` in `line`, clamped to the line end.
pub fn byte_offset(line: &[u8], col: usize) -> usize {
    line.iter()
        .enumerate()
        .filter(|(_, b)| (**b & 0xC0) != 0x80)
        .nth(col)
        .map_or(line.len(), |(idx, _)| idx)
}
