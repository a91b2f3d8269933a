//! Unbounded FIFO between the editing side and the publish batcher.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::document::Operation;

/// Create a connected queue pair.
pub fn outgoing() -> (OutgoingQueue, OutgoingReceiver) {
    let (tx, rx) = mpsc::channel();
    (OutgoingQueue { tx: Some(tx) }, OutgoingReceiver { rx })
}

/// Producer side, held by the coalescer. Pushing never blocks.
#[derive(Debug, Clone)]
pub struct OutgoingQueue {
    tx: Option<Sender<Operation>>,
}

impl OutgoingQueue {
    pub fn push(&self, op: Operation) {
        let sent = self.tx.as_ref().is_some_and(|tx| tx.send(op).is_ok());
        if !sent {
            tracing::debug!("outgoing queue closed; dropping operation");
        }
    }

    /// Hang up this producer. The receiver still yields what was queued.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

/// Consumer side, owned by the publish batcher.
#[derive(Debug)]
pub struct OutgoingReceiver {
    rx: Receiver<Operation>,
}

impl OutgoingReceiver {
    /// Block until at least one operation is queued, then take everything
    /// already waiting behind it.
    ///
    /// Returns `None` once every producer is gone and the queue is drained.
    pub fn next_batch(&self) -> Option<Vec<Operation>> {
        let first = self.rx.recv().ok()?;
        let mut batch = vec![first];
        batch.extend(self.rx.try_iter());
        Some(batch)
    }

    /// Take whatever is queued right now without blocking.
    pub fn drain(&self) -> Vec<Operation> {
        self.rx.try_iter().collect()
    }
}
