use std::collections::VecDeque;

use crate::document::{Cursor, Delete, Document, Insert, Operation};
use crate::sync::OutgoingQueue;

/// The single not-yet-flushed local edit.
///
/// Rendered over the canonical document for immediate feedback, but only the
/// copy that comes back through the transport ever becomes canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingEdit {
    Insert(Insert),
    Delete(Delete),
}

impl PendingEdit {
    pub fn to_operation(&self) -> Operation {
        self.clone().into_operation()
    }

    pub fn into_operation(self) -> Operation {
        match self {
            Self::Insert(insert) => Operation::Insert(insert),
            Self::Delete(delete) => Operation::Delete(delete),
        }
    }

    /// A typed space ends the run unless it is the run's only character or
    /// part of a run of spaces.
    fn closes_word(&self) -> bool {
        match self {
            Self::Insert(insert) => insert.text != " " && !insert.text.ends_with("  "),
            Self::Delete(_) => false,
        }
    }
}

/// Direction for cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Turns keystrokes into as few operations as possible.
///
/// Consecutive same-kind edits at a contiguous position are merged into one
/// [`PendingEdit`]. Flushing moves the pending edit, and a cursor update when
/// the cursor moved since the last one sent, onto the outgoing queue.
///
/// Flushed edits stay in an in-flight list until their echo arrives, so the
/// local view does not flicker between flush and echo.
#[derive(Debug)]
pub struct Coalescer {
    pending: Option<PendingEdit>,
    in_flight: VecDeque<Operation>,
    cursor: Cursor,
    last_sent: Cursor,
    queue: OutgoingQueue,
}

impl Coalescer {
    pub fn new(queue: OutgoingQueue) -> Self {
        Self {
            pending: None,
            in_flight: VecDeque::new(),
            cursor: Cursor::default(),
            last_sent: Cursor::default(),
            queue,
        }
    }

    /// The local cursor, in document coordinates.
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub const fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    pub const fn pending(&self) -> Option<&PendingEdit> {
        self.pending.as_ref()
    }

    /// Flushed edits still waiting for their echo, oldest first.
    pub fn in_flight(&self) -> impl Iterator<Item = &Operation> {
        self.in_flight.iter()
    }

    /// The canonical document with in-flight and pending edits applied.
    pub fn overlay(&self, doc: &Document) -> Document {
        let mut view = doc.clone();
        for op in &self.in_flight {
            view.apply(op);
        }
        if let Some(pending) = &self.pending {
            view.apply(&pending.to_operation());
        }
        view
    }

    /// Type one character at the cursor.
    pub fn type_char(&mut self, doc: &Document, ch: char) {
        let Cursor { x, y } = self.cursor;
        let extends = matches!(
            &self.pending,
            Some(PendingEdit::Insert(insert)) if insert.line == y && insert.end() == x
        );

        if extends {
            if let Some(PendingEdit::Insert(insert)) = &mut self.pending {
                insert.text.push(ch);
            }
        } else {
            self.flush(true);
            let view = self.overlay(doc);
            self.clamp_to(&view);
            self.pending = Some(PendingEdit::Insert(Insert {
                line: self.cursor.y,
                pos: self.cursor.x,
                text: ch.to_string(),
            }));
        }
        self.cursor.x += ch.len_utf8();

        if ch == ' ' && self.pending.as_ref().is_some_and(PendingEdit::closes_word) {
            self.flush(true);
        }
    }

    /// Delete the character before the cursor, joining with the previous
    /// line at column zero.
    pub fn backspace(&mut self, doc: &Document) {
        let view = self.overlay(doc);
        self.clamp_to(&view);
        let Cursor { x, y } = self.cursor;

        if x == 0 {
            if y == 0 {
                return;
            }
            // A join changes which line later deletes target, so it never
            // coalesces.
            self.flush(true);
            let prev_len = view.line_len(y - 1);
            self.cursor = Cursor::at(prev_len, y - 1);
            self.pending = Some(PendingEdit::Delete(Delete::join(y - 1, prev_len)));
            self.flush(true);
            return;
        }

        let start = prev_boundary(view.line(y).unwrap_or_default(), x);
        self.extend_delete(x, y);
        if let Some(PendingEdit::Delete(delete)) = &mut self.pending {
            delete.count += x - start;
            delete.pos = start;
        }
        self.cursor.x = start;
    }

    /// Delete the character under the cursor, joining with the next line at
    /// the end of a line.
    pub fn delete_forward(&mut self, doc: &Document) {
        let view = self.overlay(doc);
        self.clamp_to(&view);
        let Cursor { x, y } = self.cursor;
        let line = view.line(y).unwrap_or_default();

        if x >= line.len() {
            if y + 1 >= view.line_count() {
                return;
            }
            self.flush(true);
            self.pending = Some(PendingEdit::Delete(Delete::join(y, x)));
            self.flush(true);
            return;
        }

        let width = next_boundary(line, x) - x;
        self.extend_delete(x, y);
        if let Some(PendingEdit::Delete(delete)) = &mut self.pending {
            delete.count += width;
        }
    }

    /// Split the line at the cursor (Enter).
    pub fn split_line(&mut self, doc: &Document) {
        self.flush(true);
        let view = self.overlay(doc);
        self.clamp_to(&view);
        let Cursor { x, y } = self.cursor;
        self.pending = Some(PendingEdit::Insert(Insert::split(y, x)));
        self.cursor = Cursor::at(0, y + 1);
        self.flush(true);
    }

    /// Move the cursor one step. Flushes the pending edit, and sends the
    /// cursor only if it differs from the last one sent.
    pub fn move_cursor(&mut self, doc: &Document, direction: Direction) {
        self.flush(false);
        let view = self.overlay(doc);
        self.clamp_to(&view);
        let Cursor { x, y } = self.cursor;
        let line = view.line(y).unwrap_or_default();
        let last_line = view.line_count() - 1;

        self.cursor = match direction {
            Direction::Left if x > 0 => Cursor::at(prev_boundary(line, x), y),
            Direction::Left if y > 0 => Cursor::at(view.line_len(y - 1), y - 1),
            Direction::Right if x < line.len() => Cursor::at(next_boundary(line, x), y),
            Direction::Right if y < last_line => Cursor::at(0, y + 1),
            Direction::Up if y > 0 => clamp_to_line(&view, x, y - 1),
            Direction::Down if y < last_line => clamp_to_line(&view, x, y + 1),
            _ => self.cursor,
        };
        self.send_cursor();
    }

    /// Move the cursor to the start of its line (Home).
    pub fn move_home(&mut self) {
        self.flush(false);
        self.cursor.x = 0;
        self.send_cursor();
    }

    /// Move the cursor to the end of its line (End).
    pub fn move_end(&mut self, doc: &Document) {
        self.flush(false);
        let view = self.overlay(doc);
        self.clamp_to(&view);
        self.cursor.x = view.line_len(self.cursor.y);
        self.send_cursor();
    }

    /// Move the cursor to an absolute position, e.g. from a mouse click.
    pub fn move_to(&mut self, doc: &Document, target: Cursor) {
        self.flush(false);
        self.cursor = target;
        let view = self.overlay(doc);
        self.clamp_to(&view);
        self.send_cursor();
    }

    /// Queue a document replacement behind everything already flushed.
    pub fn replace_document(&mut self, content: String) {
        self.flush(true);
        self.queue.push(Operation::NewDocument(content));
    }

    /// Push the pending edit and, if requested and changed, the cursor onto
    /// the outgoing queue.
    pub fn flush(&mut self, with_cursor: bool) {
        if let Some(edit) = self.pending.take() {
            let op = edit.into_operation();
            self.in_flight.push_back(op.clone());
            self.queue.push(op);
        }
        if with_cursor {
            self.send_cursor();
        }
    }

    fn send_cursor(&mut self) {
        if self.cursor != self.last_sent {
            self.last_sent = self.cursor;
            self.queue.push(Operation::CursorMove(self.cursor));
        }
    }

    /// Record the echo of one of our own edits.
    ///
    /// Echoes arrive in publish order, so anything flushed before `op` that
    /// is still in flight was lost and is dropped too.
    pub fn acknowledge(&mut self, op: &Operation) -> bool {
        let Some(idx) = self.in_flight.iter().position(|p| p == op) else {
            return false;
        };
        self.in_flight.drain(..=idx);
        true
    }

    /// Forget edits whose batch failed to publish.
    pub fn discard(&mut self, lost: &[Operation]) {
        for op in lost {
            if let Some(idx) = self.in_flight.iter().position(|p| p == op) {
                self.in_flight.remove(idx);
            }
        }
    }

    /// Drop all local state after the document was replaced.
    pub fn reset(&mut self) {
        self.pending = None;
        self.in_flight.clear();
        self.cursor = Cursor::default();
    }

    /// Stop queueing; anything flushed afterwards is dropped.
    pub fn close(&mut self) {
        self.queue.close();
    }

    fn extend_delete(&mut self, x: usize, y: usize) {
        let extends = matches!(
            &self.pending,
            Some(PendingEdit::Delete(delete))
                if delete.line == y && delete.pos == x && !delete.is_join()
        );
        if !extends {
            self.flush(true);
            self.pending = Some(PendingEdit::Delete(Delete {
                line: y,
                pos: x,
                count: 0,
            }));
        }
    }

    fn clamp_to(&mut self, view: &Document) {
        self.cursor = clamp_to_line(view, self.cursor.x, self.cursor.y);
    }
}

/// Clamp `(x, y)` into `view`, landing on a character boundary.
fn clamp_to_line(view: &Document, x: usize, y: usize) -> Cursor {
    let y = y.min(view.line_count() - 1);
    let line = view.line(y).unwrap_or_default();
    Cursor::at(floor_boundary(line, x.min(line.len())), y)
}

const fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

fn floor_boundary(line: &[u8], mut x: usize) -> usize {
    while x > 0 && x < line.len() && is_continuation(line[x]) {
        x -= 1;
    }
    x
}

fn prev_boundary(line: &[u8], x: usize) -> usize {
    let mut start = x.min(line.len()).saturating_sub(1);
    while start > 0 && is_continuation(line[start]) {
        start -= 1;
    }
    start
}

fn next_boundary(line: &[u8], x: usize) -> usize {
    let mut end = (x + 1).min(line.len());
    while end < line.len() && is_continuation(line[end]) {
        end += 1;
    }
    end
}
