//! Benchmarks for rebuilding documents from an operation log.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use syncedit::document::{Cursor, Insert, Operation};
use syncedit::sync::{SyncState, outgoing, replay, replay_into};
use syncedit::transport::Delivered;

/// A log that types `lines` lines of prose word by word, with cursor updates.
fn typing_log(lines: usize) -> Vec<Operation> {
    let mut ops = vec![Operation::NewDocument(String::new())];
    for y in 0..lines {
        let mut x = 0;
        for word in "the quick brown fox jumps over the lazy dog ".split_inclusive(' ') {
            ops.push(Operation::Insert(Insert {
                line: y,
                pos: x,
                text: word.to_string(),
            }));
            x += word.len();
            ops.push(Operation::CursorMove(Cursor::at(x, y)));
        }
        ops.push(Operation::Insert(Insert::split(y, x)));
    }
    ops
}

fn bench_replay_document(c: &mut Criterion) {
    let ops = typing_log(1_000);
    c.bench_function("replay_1000_lines", |b| {
        b.iter(|| replay(black_box(&ops)).map(|doc| doc.line_count()))
    });
}

fn bench_replay_into_state(c: &mut Criterion) {
    let history: Vec<Delivered> = typing_log(1_000)
        .into_iter()
        .enumerate()
        .map(|(seq, op)| Delivered {
            seq: seq as u64,
            client_id: "writer".to_string(),
            op,
        })
        .collect();
    c.bench_function("join_1000_lines", |b| {
        b.iter(|| {
            let (queue, _rx) = outgoing();
            let mut state = SyncState::new("reader", queue);
            replay_into(&mut state, black_box(&history)).map(|()| state.last_seq())
        })
    });
}

criterion_group!(benches, bench_replay_document, bench_replay_into_state);
criterion_main!(benches);
