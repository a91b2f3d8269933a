//! Ordered pub/sub channels that carry the operation log.
//!
//! A [`Transport`] delivers every published operation to every subscriber,
//! including the publisher, in one global order, and can replay the full
//! history of a session from its first record.
//!
//! - [`MemoryHub`]: in-process channel, used by tests and embedders
//! - [`FileTransport`]: append-only log file shared between local processes

mod file;
mod memory;

pub use file::{FileTransport, session_log_path};
pub use memory::{MemoryHub, MemoryTransport};

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

use crate::document::Operation;

/// Errors raised at the transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode operation: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("transport is offline")]
    Offline,
    #[error("channel closed")]
    Closed,
}

/// An operation delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Position of this record in the channel's global order.
    pub seq: u64,
    /// Participant that published the operation.
    pub client_id: String,
    pub op: Operation,
}

/// FIFO stream of deliveries, in the transport's global order.
#[derive(Debug)]
pub struct Subscription {
    rx: Receiver<Delivered>,
}

impl Subscription {
    pub const fn new(rx: Receiver<Delivered>) -> Self {
        Self { rx }
    }

    /// Block until the next delivery. Returns `None` once the channel closes.
    pub fn recv(&self) -> Option<Delivered> {
        self.rx.recv().ok()
    }

    /// Wait up to `timeout` for the next delivery.
    ///
    /// # Errors
    /// Returns [`TransportError::Closed`] once the channel is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Delivered>, TransportError> {
        match self.rx.recv_timeout(timeout) {
            Ok(delivered) => Ok(Some(delivered)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    /// Drain every delivery that is already waiting.
    pub fn try_iter(&self) -> impl Iterator<Item = Delivered> + '_ {
        self.rx.try_iter()
    }
}

impl Iterator for Subscription {
    type Item = Delivered;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// A hosted, totally-ordered channel with history replay.
pub trait Transport: Send + Sync {
    /// Identity attached to everything this participant publishes.
    fn client_id(&self) -> &str;

    /// Publish `batch` atomically: its operations stay contiguous and in order.
    ///
    /// # Errors
    /// Returns an error if the batch could not be delivered to the channel.
    fn publish(&self, batch: &[Operation]) -> Result<(), TransportError>;

    /// Subscribe to all operations on the channel, including our own.
    ///
    /// # Errors
    /// Returns an error if the subscription cannot be established.
    fn subscribe(&self) -> Result<Subscription, TransportError>;

    /// Every decodable record from the start of the session, oldest first.
    ///
    /// # Errors
    /// Returns an error if the history cannot be read.
    fn history(&self) -> Result<Vec<Delivered>, TransportError>;
}

/// Length of a generated session code.
pub const CODE_LEN: usize = 8;

/// A short random session code, safe for file names and URLs.
pub fn generate_code() -> String {
    let mut bytes = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A unique participant identity starting with the display `name`.
pub fn generate_client_id(name: &str) -> String {
    format!("{name}-{}", generate_code())
}

/// The display name a client id was generated from.
pub fn display_name(client_id: &str) -> &str {
    let cut = client_id.len().saturating_sub(CODE_LEN + 1);
    match client_id.get(cut..) {
        Some(suffix) if cut > 0 && suffix.starts_with('-') => &client_id[..cut],
        _ => client_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_path_safe() {
        for _ in 0..64 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
                "unexpected character in {code}"
            );
        }
    }

    #[test]
    fn test_client_ids_are_distinct() {
        assert_ne!(generate_client_id("ann"), generate_client_id("ann"));
    }

    #[test]
    fn test_display_name_strips_random_suffix() {
        let id = generate_client_id("ann");
        assert!(id.starts_with("ann-"));
        assert_eq!(display_name(&id), "ann");
        assert_eq!(display_name("plain"), "plain");
    }

    #[test]
    fn test_subscription_reports_closed_channel() {
        let (tx, rx) = std::sync::mpsc::channel();
        let sub = Subscription::new(rx);
        drop(tx);
        assert!(matches!(
            sub.recv_timeout(Duration::from_millis(1)),
            Err(TransportError::Closed)
        ));
    }
}
