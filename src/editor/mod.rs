//! Local editing: turns keystrokes into coalesced operations.

mod coalesce;

pub use coalesce::{Coalescer, Direction, PendingEdit};
