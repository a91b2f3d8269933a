//! Core operation types.

use serde::{Deserialize, Serialize};

/// Position in canonical document coordinates.
///
/// `x` is a byte offset within line `y`. Cursors are never viewport-relative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    /// Zero-based byte column.
    pub x: usize,
    /// Zero-based line index.
    pub y: usize,
}

impl Cursor {
    /// Create a cursor at a specific position.
    pub const fn at(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Insert `text` at byte offset `pos` of line `line`.
///
/// An empty `text` splits the line at `pos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insert {
    pub line: usize,
    pub pos: usize,
    pub text: String,
}

impl Insert {
    /// Create a line split at `(line, pos)`.
    pub const fn split(line: usize, pos: usize) -> Self {
        Self {
            line,
            pos,
            text: String::new(),
        }
    }

    /// Whether this insert splits a line instead of adding text.
    pub fn is_split(&self) -> bool {
        self.text.is_empty()
    }

    /// Byte offset just past the inserted text.
    pub fn end(&self) -> usize {
        self.pos + self.text.len()
    }
}

/// Remove `count` bytes starting at `pos` on `line`.
///
/// A `count` of zero joins `line` with the line after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delete {
    pub line: usize,
    pub pos: usize,
    pub count: usize,
}

impl Delete {
    /// Create a join of `line` with its successor.
    pub const fn join(line: usize, pos: usize) -> Self {
        Self {
            line,
            pos,
            count: 0,
        }
    }

    /// Whether this delete removes a line break instead of bytes.
    pub const fn is_join(&self) -> bool {
        self.count == 0
    }
}

/// One atomic record of the shared operation log.
///
/// Serializes as the `{name, data}` envelope carried by the transport:
/// `new`, `add`, `delete` and `cursor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum Operation {
    /// Replace the whole document with `content`, split on line breaks.
    #[serde(rename = "new")]
    NewDocument(String),
    #[serde(rename = "add")]
    Insert(Insert),
    #[serde(rename = "delete")]
    Delete(Delete),
    /// Informational; never applied to the document.
    #[serde(rename = "cursor")]
    CursorMove(Cursor),
}

impl Operation {
    /// Wire name of this operation kind.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NewDocument(_) => "new",
            Self::Insert(_) => "add",
            Self::Delete(_) => "delete",
            Self::CursorMove(_) => "cursor",
        }
    }

    /// Whether this operation changes document text.
    pub const fn is_edit(&self) -> bool {
        matches!(self, Self::Insert(_) | Self::Delete(_))
    }
}

impl From<Insert> for Operation {
    fn from(insert: Insert) -> Self {
        Self::Insert(insert)
    }
}

impl From<Delete> for Operation {
    fn from(delete: Delete) -> Self {
        Self::Delete(delete)
    }
}
