//! Line-oriented document buffer and operation application.
//!
//! The [`Document`] is only ever mutated by applying an [`Operation`].
//! Application is total: an operation whose indices fall outside the current
//! bounds leaves the document untouched.

mod types;

pub use types::{Cursor, Delete, Insert, Operation};

/// An ordered sequence of byte lines.
///
/// Always holds at least one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    lines: Vec<Vec<u8>>,
}

impl Document {
    /// Create a document holding a single empty line.
    pub fn empty() -> Self {
        Self {
            lines: vec![Vec::new()],
        }
    }

    /// Create a document by splitting `content` on `\n`.
    pub fn from_text(content: &str) -> Self {
        Self {
            lines: content.split('\n').map(|l| l.as_bytes().to_vec()).collect(),
        }
    }

    /// Create a document from raw lines. An empty list becomes one empty line.
    pub fn from_lines(lines: Vec<Vec<u8>>) -> Self {
        if lines.is_empty() {
            return Self::empty();
        }
        Self { lines }
    }

    /// All lines, without line terminators.
    pub fn lines(&self) -> &[Vec<u8>] {
        &self.lines
    }

    /// Consume the document, returning its lines.
    pub fn into_lines(self) -> Vec<Vec<u8>> {
        self.lines
    }

    /// Total number of lines (never zero).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Bytes of line `idx`, if it exists.
    pub fn line(&self, idx: usize) -> Option<&[u8]> {
        self.lines.get(idx).map(Vec::as_slice)
    }

    /// Length of line `idx` in bytes, or zero past the end.
    pub fn line_len(&self, idx: usize) -> usize {
        self.lines.get(idx).map_or(0, Vec::len)
    }

    /// The document content with lines joined by `\n`.
    pub fn text(&self) -> Vec<u8> {
        self.lines.join(&b'\n')
    }

    /// Whether `op` falls inside the current bounds and would change the text.
    ///
    /// Cursor moves never apply.
    pub fn accepts(&self, op: &Operation) -> bool {
        match op {
            Operation::NewDocument(_) => true,
            Operation::Insert(insert) => self
                .lines
                .get(insert.line)
                .is_some_and(|line| insert.pos <= line.len()),
            Operation::Delete(delete) => {
                let Some(line) = self.lines.get(delete.line) else {
                    return false;
                };
                if delete.is_join() {
                    return delete.line + 1 < self.lines.len();
                }
                delete
                    .pos
                    .checked_add(delete.count)
                    .is_some_and(|end| end <= line.len())
            }
            Operation::CursorMove(_) => false,
        }
    }

    /// Apply `op` in place.
    ///
    /// Returns `true` if the document changed shape or content; out-of-range
    /// operations are silently ignored.
    pub fn apply(&mut self, op: &Operation) -> bool {
        if !self.accepts(op) {
            return false;
        }

        match op {
            Operation::NewDocument(content) => {
                *self = Self::from_text(content);
            }
            Operation::Insert(insert) => {
                let line = &mut self.lines[insert.line];
                if insert.is_split() {
                    let tail = line.split_off(insert.pos);
                    self.lines.insert(insert.line + 1, tail);
                } else {
                    line.splice(insert.pos..insert.pos, insert.text.bytes());
                }
            }
            Operation::Delete(delete) => {
                if delete.is_join() {
                    let next = self.lines.remove(delete.line + 1);
                    self.lines[delete.line].extend_from_slice(&next);
                } else {
                    self.lines[delete.line].drain(delete.pos..delete.pos + delete.count);
                }
            }
            Operation::CursorMove(_) => return false,
        }
        true
    }

    /// Return a copy of this document with `op` applied.
    #[must_use]
    pub fn with(&self, op: &Operation) -> Self {
        let mut next = self.clone();
        next.apply(op);
        next
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

/// Apply `op` to `doc`, returning the resulting document.
///
/// Out-of-range operations return `doc` unchanged.
pub fn apply(mut doc: Document, op: &Operation) -> Document {
    doc.apply(op);
    doc
}
