//! Session bootstrap: connect, replay, then go live.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::document::Operation;
use crate::transport::{Transport, TransportError};

use super::Notice;
use super::batcher::PublishBatcher;
use super::queue;
use super::replay::{ReplayError, replay_into};
use super::state::{Engine, SyncState};
use super::ticker::Ticker;

/// How often pending edits and cursor moves are flushed.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(600);

/// Errors that prevent a session from starting.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session '{0}' already exists")]
    AlreadyExists(String),
    #[error("session '{0}' does not exist")]
    NotFound(String),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub flush_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// How this participant enters the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// Start the session by publishing its initial content.
    Create(String),
    /// Join a session someone else started.
    Join,
}

/// A live session: engine plus the background tasks feeding it.
///
/// - inbound: applies every delivery from the subscription
/// - batcher: publishes whatever the coalescer queued
/// - ticker: flushes the coalescer every `flush_interval`
pub struct Session {
    engine: Engine,
    client_id: String,
    notices: Receiver<Notice>,
    ticker: Ticker,
    batcher: Option<JoinHandle<()>>,
}

impl Session {
    /// Subscribe, optionally publish the initial document, replay history
    /// and start the background tasks.
    ///
    /// The subscription is opened before history is read, and deliveries
    /// already covered by history are skipped by sequence number, so no
    /// operation is lost or applied twice in between.
    ///
    /// # Errors
    /// Fails if the transport cannot subscribe, publish or read history, or
    /// if the history does not start with a document.
    pub fn start(
        transport: Arc<dyn Transport>,
        bootstrap: Bootstrap,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let subscription = transport.subscribe()?;
        if let Bootstrap::Create(content) = bootstrap {
            transport.publish(&[Operation::NewDocument(content)])?;
        }
        let history = transport.history()?;

        let client_id = transport.client_id().to_string();
        let (queue, outgoing) = queue::outgoing();
        let mut state = SyncState::new(client_id.clone(), queue);
        replay_into(&mut state, &history)?;
        let engine = Engine::new(state);

        let inbound = engine.clone();
        thread::spawn(move || {
            for delivered in subscription {
                inbound.apply_delivered(&delivered);
            }
            tracing::debug!("subscription closed");
        });

        let (notice_tx, notices) = mpsc::channel();
        let on_failure = engine.clone();
        let batcher = PublishBatcher::new(transport, outgoing).spawn(move |failure| {
            on_failure.discard_lost(&failure.lost);
            let _ = notice_tx.send(Notice::PublishFailed(failure.error.to_string()));
        });

        let ticking = engine.clone();
        let ticker = Ticker::spawn(options.flush_interval, move || ticking.tick());

        tracing::info!(%client_id, "session started");
        Ok(Self {
            engine,
            client_id,
            notices,
            ticker,
            batcher: Some(batcher),
        })
    }

    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Next notice from the background tasks, if any.
    pub fn try_notice(&self) -> Option<Notice> {
        self.notices.try_recv().ok()
    }

    /// Replace the shared document for every participant.
    ///
    /// Local editing pauses until the replacement is delivered back.
    pub fn new_document(&self, content: impl Into<String>) {
        self.engine.request_new_document(content);
    }

    /// Flush what is pending, stop the timer and wait for queued batches to
    /// be published.
    pub fn shutdown(mut self) {
        self.ticker.stop();
        self.engine.close();
        if let Some(batcher) = self.batcher.take()
            && batcher.join().is_err()
        {
            tracing::warn!("publish batcher panicked");
        }
        tracing::info!(client_id = %self.client_id, "session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryHub;

    #[test]
    fn test_create_publishes_initial_document() {
        let hub = MemoryHub::new();
        let session = Session::start(
            Arc::new(hub.connect("owner")),
            Bootstrap::Create("hello".to_string()),
            SessionOptions::default(),
        )
        .unwrap();
        assert_eq!(session.engine().document_text(), b"hello");
        assert_eq!(hub.len(), 1);
        session.shutdown();
    }

    #[test]
    fn test_join_empty_session_fails() {
        let hub = MemoryHub::new();
        let result = Session::start(
            Arc::new(hub.connect("guest")),
            Bootstrap::Join,
            SessionOptions::default(),
        );
        assert!(matches!(
            result,
            Err(SessionError::Replay(ReplayError::NoDocumentFound))
        ));
    }

    #[test]
    fn test_create_fails_when_offline() {
        let hub = MemoryHub::new();
        hub.set_offline(true);
        let result = Session::start(
            Arc::new(hub.connect("owner")),
            Bootstrap::Create(String::new()),
            SessionOptions::default(),
        );
        assert!(matches!(
            result,
            Err(SessionError::Transport(TransportError::Offline))
        ));
    }

    #[test]
    fn test_shutdown_publishes_pending_edit() {
        let hub = MemoryHub::new();
        let session = Session::start(
            Arc::new(hub.connect("owner")),
            Bootstrap::Create(String::new()),
            SessionOptions {
                flush_interval: Duration::from_secs(60),
            },
        )
        .unwrap();
        session.engine().type_char('a');
        session.shutdown();

        let ops: Vec<_> = hub
            .connect("reader")
            .history()
            .unwrap()
            .into_iter()
            .map(|d| d.op)
            .collect();
        assert_eq!(ops.len(), 3, "document, insert, cursor: {ops:?}");
        assert!(matches!(ops[1], Operation::Insert(_)));
    }
}
