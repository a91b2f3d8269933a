//! Terminal UI components.
//!
//! - [`viewport`]: Scroll position and visible range management
//! - `render`: document area with local and remote cursors
//! - `status`, `overlays`: status bar, toasts and the help popup

pub mod viewport;

mod overlays;
mod render;
mod status;

pub use render::{byte_offset, display_column, gutter_width, render};
