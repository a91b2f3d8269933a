// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. transport::TransportError)
    clippy::module_name_repetitions
)]

//! # sync-edit
//!
//! Collaborative plain-text editing in the terminal.
//!
//! Every participant keeps a full copy of a line-oriented document and
//! exchanges small edit operations through a shared, totally ordered log.
//! Because everyone applies the same operations in the same order, every
//! replica converges without a central server merging edits.
//!
//! ## Architecture
//!
//! The engine is layered bottom-up:
//! - **Document**: a byte-line buffer mutated only by [`document::Operation`]s
//! - **Coalescer**: turns keystrokes into a few compact operations
//! - **Publish batcher**: ships queued operations to the log in order
//! - **Reconciler**: applies delivered operations and keeps cursors anchored
//! - **Session**: replays history, then goes live
//!
//! The front-end uses The Elm Architecture (TEA):
//! - **Model**: front-end state around the shared engine
//! - **Message**: events and actions
//! - **Update**: state transitions
//! - **View**: render to terminal
//!
//! ## Modules
//!
//! - [`document`]: Document buffer and operations
//! - [`editor`]: Local edit coalescing
//! - [`sync`]: Replay, reconciliation, batching and session lifecycle
//! - [`transport`]: Ordered broadcast channels (in-memory and log file)
//! - [`wire`]: JSON encoding of operations
//! - [`app`]: Main application loop and state
//! - [`ui`]: Terminal UI components
//! - [`watcher`]: Session log change notifications
//! - [`config`]: Persistent CLI defaults

pub mod app;
pub mod config;
pub mod document;
pub mod editor;
pub mod sync;
pub mod transport;
pub mod ui;
pub mod watcher;
pub mod wire;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::document::{Cursor, Document, Operation};
    pub use crate::sync::{Bootstrap, Engine, Session, SessionError, SessionOptions};
    pub use crate::transport::{FileTransport, MemoryHub, Transport};
    pub use crate::ui::viewport::Viewport;
}
