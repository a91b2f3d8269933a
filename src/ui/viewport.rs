//! Viewport management for scrolling.
//!
//! The [`Viewport`] tracks which slice of the document is on screen and
//! scrolls just enough to keep the local cursor visible.

use std::ops::Range;

/// Manages the visible portion of a document.
///
/// # Example
///
/// ```
/// use syncedit::ui::viewport::Viewport;
///
/// let mut vp = Viewport::new(80, 24, 100);
/// assert_eq!(vp.visible_range(), 0..24);
///
/// vp.follow(30, 0);
/// assert_eq!(vp.visible_range(), 7..31);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    width: u16,
    height: u16,
    offset: usize,
    column: usize,
    total_lines: usize,
}

impl Viewport {
    /// Create a new viewport.
    ///
    /// # Arguments
    ///
    /// * `width` - Text area width in columns
    /// * `height` - Text area height in lines
    /// * `total_lines` - Total lines in the document
    pub const fn new(width: u16, height: u16, total_lines: usize) -> Self {
        Self {
            width,
            height,
            offset: 0,
            column: 0,
            total_lines,
        }
    }

    /// First visible line.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// First visible column.
    pub const fn column(&self) -> usize {
        self.column
    }

    pub const fn width(&self) -> u16 {
        self.width
    }

    pub const fn height(&self) -> u16 {
        self.height
    }

    pub const fn total_lines(&self) -> usize {
        self.total_lines
    }

    /// Get the range of visible lines, clamped to the document.
    pub fn visible_range(&self) -> Range<usize> {
        let start = self.offset.min(self.total_lines);
        let end = (self.offset + self.height as usize).min(self.total_lines);
        start..end
    }

    /// Get the scroll percentage (0-100).
    pub fn scroll_percent(&self) -> u8 {
        let max_offset = self.max_offset();
        if max_offset == 0 {
            return 100;
        }

        // Percentage value always 0-100
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        {
            ((self.offset.min(max_offset) as f64 / max_offset as f64) * 100.0).round() as u8
        }
    }

    /// Scroll the minimum amount that puts `(line, col)` on screen.
    pub fn follow(&mut self, line: usize, col: usize) {
        let height = self.height as usize;
        if height > 0 {
            if line < self.offset {
                self.offset = line;
            } else if line >= self.offset + height {
                self.offset = line + 1 - height;
            }
        }
        self.offset = self.offset.min(self.max_offset());

        let width = self.width as usize;
        if width > 0 {
            if col < self.column {
                self.column = col;
            } else if col >= self.column + width {
                self.column = col + 1 - width;
            }
        }
    }

    /// Resize the viewport.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Update the total number of lines after the document changed.
    pub fn set_total_lines(&mut self, total: usize) {
        self.total_lines = total;
        self.offset = self.offset.min(self.max_offset());
    }

    const fn max_offset(&self) -> usize {
        self.total_lines.saturating_sub(self.height as usize)
    }
}
