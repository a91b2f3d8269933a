//! Applying delivered operations to the shared state.

use crate::document::{Cursor, Document, Operation};
use crate::transport::Delivered;

use super::state::SyncState;

impl SyncState {
    /// Apply one delivery from the live subscription.
    ///
    /// Deliveries at or before the last applied sequence number were already
    /// seen through history replay and are skipped. Returns whether the
    /// delivery was applied.
    pub fn apply_delivered(&mut self, delivered: &Delivered) -> bool {
        let from_self = delivered.client_id == self.client_id;
        self.apply_sequenced(delivered, from_self)
    }

    /// Apply a history record. Replayed operations are always treated as
    /// remote, even those this participant published.
    pub(super) fn replay_delivered(&mut self, delivered: &Delivered) -> bool {
        self.apply_sequenced(delivered, false)
    }

    fn apply_sequenced(&mut self, delivered: &Delivered, from_self: bool) -> bool {
        if self.last_seq.is_some_and(|seen| delivered.seq <= seen) {
            tracing::trace!(seq = delivered.seq, "skipping already applied delivery");
            return false;
        }
        self.last_seq = Some(delivered.seq);
        self.apply_remote(&delivered.client_id, &delivered.op, from_self);
        true
    }

    /// Apply `op` from `origin` to the canonical document.
    ///
    /// Remote edits shift the local cursor to stay anchored to the text it
    /// was on. Our own echoes only settle the matching in-flight edit.
    pub fn apply_remote(&mut self, origin: &str, op: &Operation, from_self: bool) {
        match op {
            Operation::NewDocument(_) => {
                self.document.apply(op);
                self.coalescer.reset();
                self.editable = true;
                tracing::debug!(origin, "document replaced");
            }
            Operation::CursorMove(cursor) => {
                self.cursors.insert(origin.to_string(), *cursor);
            }
            Operation::Insert(_) | Operation::Delete(_) => {
                if from_self {
                    self.coalescer.acknowledge(op);
                } else if self.document.accepts(op) {
                    let anchored = anchor_cursor(self.coalescer.cursor(), op, &self.document);
                    self.coalescer.set_cursor(anchored);
                }
                if !self.document.apply(op) {
                    tracing::debug!(origin, op = op.name(), "ignoring out-of-range operation");
                }
            }
        }
        self.dirty = true;
    }
}

/// Where `cursor` should move when `op` is applied to `doc`.
///
/// `doc` is the document before the operation. These are line-local
/// heuristics, not a full transform: a cursor on the split line keeps its
/// column, and an insert on the cursor line shifts it when the insert
/// starts no further than its own length past the cursor.
pub fn anchor_cursor(cursor: Cursor, op: &Operation, doc: &Document) -> Cursor {
    let Cursor { x, y } = cursor;
    match op {
        Operation::Insert(insert) if insert.is_split() => {
            if insert.line < y || (insert.line == y && insert.pos <= x) {
                Cursor::at(x, y + 1)
            } else {
                cursor
            }
        }
        Operation::Insert(insert) => {
            let len = insert.text.len();
            if insert.line == y && insert.pos <= x + len {
                Cursor::at(x + len, y)
            } else {
                cursor
            }
        }
        Operation::Delete(delete) if delete.is_join() => {
            if delete.line + 1 == y {
                Cursor::at(doc.line_len(delete.line) + x, y - 1)
            } else if delete.line + 1 < y {
                Cursor::at(x, y - 1)
            } else {
                cursor
            }
        }
        Operation::Delete(delete) => {
            if delete.line == y && delete.pos + delete.count <= x {
                Cursor::at(x - delete.count, y)
            } else {
                cursor
            }
        }
        Operation::NewDocument(_) | Operation::CursorMove(_) => cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Delete, Insert};
    use crate::sync::{OutgoingReceiver, outgoing};

    fn state_with(text: &str) -> (SyncState, OutgoingReceiver) {
        let (queue, rx) = outgoing();
        let mut state = SyncState::new("me", queue);
        state.apply_remote("owner", &Operation::NewDocument(text.to_string()), false);
        (state, rx)
    }

    fn insert(line: usize, pos: usize, text: &str) -> Operation {
        Operation::Insert(Insert {
            line,
            pos,
            text: text.to_string(),
        })
    }

    fn delivered(seq: u64, client_id: &str, op: Operation) -> Delivered {
        Delivered {
            seq,
            client_id: client_id.to_string(),
            op,
        }
    }

    // --- Cursor anchoring ---

    #[test]
    fn test_split_above_cursor_moves_it_down() {
        let doc = Document::from_text("a\nb\ncdef");
        let moved = anchor_cursor(Cursor::at(3, 2), &Operation::Insert(Insert::split(2, 1)), &doc);
        assert_eq!(moved, Cursor::at(3, 3));
    }

    #[test]
    fn test_split_after_cursor_leaves_it() {
        let doc = Document::from_text("abcdef");
        let moved = anchor_cursor(Cursor::at(1, 0), &Operation::Insert(Insert::split(0, 4)), &doc);
        assert_eq!(moved, Cursor::at(1, 0));
    }

    #[test]
    fn test_insert_before_cursor_shifts_it() {
        let doc = Document::from_text("hello");
        let moved = anchor_cursor(Cursor::at(3, 0), &insert(0, 1, "xy"), &doc);
        assert_eq!(moved, Cursor::at(5, 0));
    }

    #[test]
    fn test_insert_on_other_line_leaves_cursor() {
        let doc = Document::from_text("hello\nworld");
        let moved = anchor_cursor(Cursor::at(3, 0), &insert(1, 0, "xy"), &doc);
        assert_eq!(moved, Cursor::at(3, 0));
    }

    #[test]
    fn test_join_into_cursor_line_moves_cursor_up() {
        let doc = Document::from_text("abc\ndef");
        let moved = anchor_cursor(
            Cursor::at(2, 1),
            &Operation::Delete(Delete::join(0, 3)),
            &doc,
        );
        assert_eq!(moved, Cursor::at(5, 0));
    }

    #[test]
    fn test_join_above_cursor_line_moves_row_only() {
        let doc = Document::from_text("a\nb\nc");
        let moved = anchor_cursor(
            Cursor::at(1, 2),
            &Operation::Delete(Delete::join(0, 1)),
            &doc,
        );
        assert_eq!(moved, Cursor::at(1, 1));
    }

    #[test]
    fn test_delete_before_cursor_shifts_left() {
        let doc = Document::from_text("hello");
        let op = Operation::Delete(Delete {
            line: 0,
            pos: 0,
            count: 2,
        });
        assert_eq!(anchor_cursor(Cursor::at(4, 0), &op, &doc), Cursor::at(2, 0));
        assert_eq!(anchor_cursor(Cursor::at(1, 0), &op, &doc), Cursor::at(1, 0));
    }

    // --- Applying deliveries ---

    #[test]
    fn test_remote_split_above_moves_local_cursor() {
        let (mut state, _rx) = state_with("a\nb\ncdef");
        state.move_to(Cursor::at(3, 2));
        state.apply_remote("peer", &Operation::Insert(Insert::split(2, 1)), false);
        assert_eq!(state.local_cursor(), Cursor::at(3, 3));
        assert_eq!(state.document().line_count(), 4);
    }

    #[test]
    fn test_rejected_remote_edit_changes_nothing() {
        let (mut state, _rx) = state_with("abc");
        state.move_to(Cursor::at(2, 0));
        state.apply_remote("peer", &insert(0, 10, "zz"), false);
        assert_eq!(state.local_cursor(), Cursor::at(2, 0));
        assert_eq!(state.document().text(), b"abc");
    }

    #[test]
    fn test_own_echo_settles_in_flight_without_moving_cursor() {
        let (mut state, rx) = state_with("");
        for ch in "ab ".chars() {
            state.type_char(ch);
        }
        let sent: Vec<_> = rx.drain().into_iter().filter(Operation::is_edit).collect();
        assert_eq!(sent, vec![insert(0, 0, "ab ")]);

        state.apply_remote("me", &sent[0], true);
        assert_eq!(state.local_cursor(), Cursor::at(3, 0));
        assert_eq!(state.coalescer().in_flight().count(), 0);
        assert_eq!(state.rendered_lines(), vec![b"ab ".to_vec()]);
    }

    #[test]
    fn test_cursor_moves_are_recorded_per_participant() {
        let (mut state, _rx) = state_with("hello");
        state.apply_remote("peer", &Operation::CursorMove(Cursor::at(4, 0)), false);
        state.apply_remote("me", &Operation::CursorMove(Cursor::at(1, 0)), true);
        assert_eq!(state.cursor_for("peer"), Some(Cursor::at(4, 0)));
        assert_eq!(state.cursor_for("me"), Some(Cursor::at(1, 0)));
        assert_eq!(state.local_cursor(), Cursor::at(0, 0));
    }

    #[test]
    fn test_new_document_resets_local_state() {
        let (mut state, _rx) = state_with("hello");
        state.move_end();
        state.type_char('x');
        state.request_new_document("fresh");
        assert!(!state.is_editable());

        state.apply_remote("me", &Operation::NewDocument("fresh".to_string()), true);
        assert!(state.is_editable());
        assert_eq!(state.local_cursor(), Cursor::at(0, 0));
        assert!(state.coalescer().pending().is_none());
        assert_eq!(state.rendered_lines(), vec![b"fresh".to_vec()]);
    }

    #[test]
    fn test_already_applied_sequence_numbers_are_skipped() {
        let (queue, _rx) = outgoing();
        let mut state = SyncState::new("me", queue);
        let first = delivered(0, "owner", Operation::NewDocument("ab".to_string()));
        let second = delivered(1, "peer", insert(0, 2, "c"));

        assert!(state.apply_delivered(&first));
        assert!(state.apply_delivered(&second));
        assert!(!state.apply_delivered(&second));
        assert_eq!(state.document().text(), b"abc");
        assert_eq!(state.last_seq(), Some(1));
    }

    #[test]
    fn test_local_edits_on_top_of_remote_text() {
        let (mut state, _rx) = state_with("world");
        state.type_char('>');
        state.apply_remote("peer", &insert(0, 5, "!"), false);
        assert_eq!(state.rendered_lines(), vec![b">world!".to_vec()]);
    }
}
