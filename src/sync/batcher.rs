//! Background task that drains the outgoing queue into the transport.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::document::Operation;
use crate::transport::{Transport, TransportError};

use super::queue::OutgoingReceiver;

/// A batch that could not be published. It is not retried.
#[derive(Debug)]
pub struct PublishFailure {
    pub error: TransportError,
    pub lost: Vec<Operation>,
}

/// Publishes everything queued since the last publish as one batch, so the
/// transport sees a local burst as a single contiguous run.
pub struct PublishBatcher {
    transport: Arc<dyn Transport>,
    outgoing: OutgoingReceiver,
}

impl PublishBatcher {
    pub fn new(transport: Arc<dyn Transport>, outgoing: OutgoingReceiver) -> Self {
        Self {
            transport,
            outgoing,
        }
    }

    /// Publish batches until every producer is gone, reporting failures to
    /// `on_failure`.
    pub fn run(self, mut on_failure: impl FnMut(PublishFailure)) {
        while let Some(batch) = self.outgoing.next_batch() {
            if let Err(failure) = self.publish(batch) {
                on_failure(failure);
            }
        }
        tracing::debug!("outgoing queue closed; publish batcher stopping");
    }

    /// Run on a dedicated thread.
    pub fn spawn(self, on_failure: impl FnMut(PublishFailure) + Send + 'static) -> JoinHandle<()> {
        thread::spawn(move || self.run(on_failure))
    }

    fn publish(&self, batch: Vec<Operation>) -> Result<(), PublishFailure> {
        match self.transport.publish(&batch) {
            Ok(()) => {
                tracing::trace!(ops = batch.len(), "published batch");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, ops = batch.len(), "publish failed; dropping batch");
                Err(PublishFailure { error, lost: batch })
            }
        }
    }
}
