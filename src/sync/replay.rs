//! Rebuilding a document from a session's operation log.

use crate::document::{Document, Operation};
use crate::transport::Delivered;

use super::state::SyncState;

/// Errors from replaying an operation log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// The log is empty or does not start with a document.
    #[error("no document found in session")]
    NoDocumentFound,
}

/// Fold `history` into a document.
///
/// The first operation must create the document. Later operations that do
/// not fit the document at their point in the log are skipped, exactly as
/// a live participant would skip them.
///
/// # Errors
/// Returns [`ReplayError::NoDocumentFound`] if `history` is empty or does not
/// start with a [`Operation::NewDocument`].
pub fn replay<'a>(
    history: impl IntoIterator<Item = &'a Operation>,
) -> Result<Document, ReplayError> {
    let mut ops = history.into_iter();
    let first = ops.next().ok_or(ReplayError::NoDocumentFound)?;
    if !matches!(first, Operation::NewDocument(_)) {
        return Err(ReplayError::NoDocumentFound);
    }

    let mut doc = Document::empty();
    doc.apply(first);
    for op in ops {
        doc.apply(op);
    }
    Ok(doc)
}

/// Bring a fresh participant's state up to date with `history`.
///
/// Every record is applied as a remote operation, cursor moves included, and
/// the sequence number of the last one is remembered so the live stream can
/// skip what was already replayed.
///
/// # Errors
/// Returns [`ReplayError::NoDocumentFound`] if the log does not start with a
/// document.
pub fn replay_into(state: &mut SyncState, history: &[Delivered]) -> Result<(), ReplayError> {
    match history.first() {
        Some(Delivered {
            op: Operation::NewDocument(_),
            ..
        }) => {}
        _ => return Err(ReplayError::NoDocumentFound),
    }

    for delivered in history {
        state.replay_delivered(delivered);
    }
    tracing::info!(
        records = history.len(),
        lines = state.document().line_count(),
        "replayed session history"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Cursor, Delete, Insert};
    use crate::sync::outgoing;

    fn insert(line: usize, pos: usize, text: &str) -> Operation {
        Operation::Insert(Insert {
            line,
            pos,
            text: text.to_string(),
        })
    }

    #[test]
    fn test_replay_empty_log_fails() {
        let history: Vec<Operation> = Vec::new();
        assert_eq!(replay(&history), Err(ReplayError::NoDocumentFound));
    }

    #[test]
    fn test_replay_requires_leading_document() {
        let history = vec![insert(0, 0, "a"), Operation::NewDocument("x".to_string())];
        assert_eq!(replay(&history), Err(ReplayError::NoDocumentFound));
    }

    #[test]
    fn test_replay_folds_edits_in_order() {
        let history = vec![
            Operation::NewDocument("hello".to_string()),
            insert(0, 5, " world"),
            Operation::CursorMove(Cursor::at(3, 0)),
            Operation::Insert(Insert::split(0, 5)),
            Operation::Delete(Delete {
                line: 1,
                pos: 0,
                count: 1,
            }),
        ];
        let doc = replay(&history).unwrap();
        assert_eq!(doc.text(), b"hello\nworld");
    }

    #[test]
    fn test_replay_skips_operations_that_do_not_fit() {
        let history = vec![
            Operation::NewDocument("ab".to_string()),
            insert(3, 0, "lost"),
            insert(0, 2, "c"),
        ];
        assert_eq!(replay(&history).unwrap().text(), b"abc");
    }

    #[test]
    fn test_later_new_document_replaces_earlier_content() {
        let history = vec![
            Operation::NewDocument("old".to_string()),
            insert(0, 0, "x"),
            Operation::NewDocument("new".to_string()),
        ];
        assert_eq!(replay(&history).unwrap().text(), b"new");
    }

    #[test]
    fn test_replay_into_records_cursors_and_sequence() {
        let (queue, _rx) = outgoing();
        let mut state = SyncState::new("me", queue);
        let history = vec![
            Delivered {
                seq: 0,
                client_id: "owner".to_string(),
                op: Operation::NewDocument("hi".to_string()),
            },
            Delivered {
                seq: 2,
                client_id: "owner".to_string(),
                op: Operation::CursorMove(Cursor::at(2, 0)),
            },
        ];
        replay_into(&mut state, &history).unwrap();
        assert_eq!(state.document().text(), b"hi");
        assert_eq!(state.cursor_for("owner"), Some(Cursor::at(2, 0)));
        assert_eq!(state.last_seq(), Some(2));
    }

    #[test]
    fn test_replay_into_rejects_log_without_document() {
        let (queue, _rx) = outgoing();
        let mut state = SyncState::new("me", queue);
        let history = vec![Delivered {
            seq: 0,
            client_id: "owner".to_string(),
            op: insert(0, 0, "a"),
        }];
        assert_eq!(
            replay_into(&mut state, &history),
            Err(ReplayError::NoDocumentFound)
        );
        assert_eq!(state.last_seq(), None);
    }

    #[test]
    fn test_two_participants_replaying_same_history_agree() {
        let history: Vec<Delivered> = [
            Operation::NewDocument("x".to_string()),
            insert(0, 1, "y"),
            Operation::Delete(Delete {
                line: 0,
                pos: 0,
                count: 1,
            }),
        ]
        .into_iter()
        .enumerate()
        .map(|(seq, op)| Delivered {
            seq: seq as u64,
            client_id: "owner".to_string(),
            op,
        })
        .collect();

        let (queue_a, _rx_a) = outgoing();
        let (queue_b, _rx_b) = outgoing();
        let mut first = SyncState::new("owner", queue_a);
        let mut second = SyncState::new("guest", queue_b);
        replay_into(&mut first, &history).unwrap();
        replay_into(&mut second, &history).unwrap();

        assert_eq!(first.rendered_lines(), vec![b"y".to_vec()]);
        assert_eq!(second.rendered_lines(), vec![b"y".to_vec()]);
        assert_eq!(first.document(), second.document());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_operation() -> impl Strategy<Value = Operation> {
            prop_oneof![
                (0..6usize, 0..10usize, "[a-z ]{0,4}")
                    .prop_map(|(line, pos, text)| insert(line, pos, &text)),
                (0..6usize, 0..10usize, 0..4usize)
                    .prop_map(|(line, pos, count)| Operation::Delete(Delete { line, pos, count })),
                (0..10usize, 0..6usize).prop_map(|(x, y)| Operation::CursorMove(Cursor::at(x, y))),
            ]
        }

        fn arb_log() -> impl Strategy<Value = Vec<Delivered>> {
            (
                "[a-z\n]{0,24}",
                prop::collection::vec((arb_operation(), prop::bool::ANY), 0..40),
            )
                .prop_map(|(content, ops)| {
                    std::iter::once((Operation::NewDocument(content), false))
                        .chain(ops)
                        .enumerate()
                        .map(|(seq, (op, mine))| Delivered {
                            seq: seq as u64,
                            client_id: if mine { "me" } else { "peer" }.to_string(),
                            op,
                        })
                        .collect()
                })
        }

        proptest! {
            #[test]
            fn replaying_a_log_is_deterministic(log in arb_log()) {
                let ops: Vec<_> = log.iter().map(|d| d.op.clone()).collect();
                let first = replay(&ops).unwrap();
                let second = replay(&ops).unwrap();
                prop_assert_eq!(first, second);
            }

            #[test]
            fn joining_participant_matches_pure_replay(log in arb_log()) {
                let (queue, rx) = outgoing();
                let mut state = SyncState::new("me", queue);
                replay_into(&mut state, &log).unwrap();
                let expected = replay(log.iter().map(|d| &d.op)).unwrap();
                prop_assert_eq!(state.document(), &expected);
                prop_assert!(rx.drain().is_empty());
            }
        }
    }
}
