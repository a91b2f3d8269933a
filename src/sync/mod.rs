//! The synchronization engine.
//!
//! Every participant applies the same totally-ordered operation log, so all
//! documents converge. Local keystrokes are coalesced into few operations and
//! only shown optimistically until the transport echoes them back.
//!
//! ## Modules
//!
//! - [`queue`]: outgoing FIFO between editing and publishing
//! - `state`: shared [`SyncState`] and its [`Engine`] handle
//! - `reconcile`: applying delivered operations, cursor anchoring
//! - `replay`: rebuilding a document from history
//! - `batcher`, `ticker`: background publish and flush tasks
//! - `session`: bootstrap and lifecycle

mod batcher;
pub mod queue;
mod reconcile;
mod replay;
mod session;
mod state;
mod ticker;

pub use batcher::{PublishBatcher, PublishFailure};
pub use queue::{OutgoingQueue, OutgoingReceiver, outgoing};
pub use reconcile::anchor_cursor;
pub use replay::{ReplayError, replay, replay_into};
pub use session::{Bootstrap, DEFAULT_FLUSH_INTERVAL, Session, SessionError, SessionOptions};
pub use state::{Engine, SyncState};
pub use ticker::Ticker;

/// Something the user should hear about from a background task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A batch of local operations could not be published and was dropped.
    PublishFailed(String),
}
