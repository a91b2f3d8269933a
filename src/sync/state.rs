//! Shared session state and the handle the UI and background tasks use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::document::{Cursor, Document, Operation};
use crate::editor::{Coalescer, Direction};
use crate::transport::Delivered;

use super::queue::OutgoingQueue;

/// Everything one participant knows about the session.
///
/// The canonical document only ever changes through operations delivered by
/// the transport. Local edits live in the coalescer until their echo arrives.
#[derive(Debug)]
pub struct SyncState {
    pub(super) client_id: String,
    pub(super) document: Document,
    pub(super) coalescer: Coalescer,
    pub(super) cursors: HashMap<String, Cursor>,
    pub(super) last_seq: Option<u64>,
    pub(super) dirty: bool,
    pub(super) editable: bool,
}

impl SyncState {
    pub fn new(client_id: impl Into<String>, queue: OutgoingQueue) -> Self {
        Self {
            client_id: client_id.into(),
            document: Document::empty(),
            coalescer: Coalescer::new(queue),
            cursors: HashMap::new(),
            last_seq: None,
            dirty: true,
            editable: true,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The canonical document: every delivered operation, nothing else.
    pub const fn document(&self) -> &Document {
        &self.document
    }

    pub const fn coalescer(&self) -> &Coalescer {
        &self.coalescer
    }

    /// What the local participant should see: the canonical document with
    /// its own unconfirmed edits on top.
    pub fn view(&self) -> Document {
        self.coalescer.overlay(&self.document)
    }

    pub fn rendered_lines(&self) -> Vec<Vec<u8>> {
        self.view().into_lines()
    }

    pub const fn local_cursor(&self) -> Cursor {
        self.coalescer.cursor()
    }

    /// Last cursor position announced by `client_id`.
    pub fn cursor_for(&self, client_id: &str) -> Option<Cursor> {
        self.cursors.get(client_id).copied()
    }

    /// Every other participant's announced cursor, ordered by identity.
    pub fn remote_cursors(&self) -> Vec<(String, Cursor)> {
        let mut cursors: Vec<_> = self
            .cursors
            .iter()
            .filter(|(id, _)| **id != self.client_id)
            .map(|(id, cursor)| (id.clone(), *cursor))
            .collect();
        cursors.sort_by(|a, b| a.0.cmp(&b.0));
        cursors
    }

    /// Sequence number of the last delivery applied.
    pub const fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }

    /// False between requesting a new document and seeing it delivered.
    pub const fn is_editable(&self) -> bool {
        self.editable
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear and return the redraw flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    // --- Local input ---

    pub fn type_char(&mut self, ch: char) {
        if self.editable {
            self.coalescer.type_char(&self.document, ch);
            self.dirty = true;
        }
    }

    pub fn backspace(&mut self) {
        if self.editable {
            self.coalescer.backspace(&self.document);
            self.dirty = true;
        }
    }

    pub fn delete_forward(&mut self) {
        if self.editable {
            self.coalescer.delete_forward(&self.document);
            self.dirty = true;
        }
    }

    pub fn split_line(&mut self) {
        if self.editable {
            self.coalescer.split_line(&self.document);
            self.dirty = true;
        }
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        self.coalescer.move_cursor(&self.document, direction);
        self.dirty = true;
    }

    pub fn move_home(&mut self) {
        self.coalescer.move_home();
        self.dirty = true;
    }

    pub fn move_end(&mut self) {
        self.coalescer.move_end(&self.document);
        self.dirty = true;
    }

    pub fn move_to(&mut self, target: Cursor) {
        self.coalescer.move_to(&self.document, target);
        self.dirty = true;
    }

    /// Periodic flush: pending edit plus cursor if it moved.
    pub fn tick(&mut self) {
        self.coalescer.flush(true);
    }

    /// Ask every participant to replace the document with `content`.
    ///
    /// Editing is suspended until the replacement comes back.
    pub fn request_new_document(&mut self, content: impl Into<String>) {
        self.coalescer.replace_document(content.into());
        self.editable = false;
        self.dirty = true;
    }

    /// Forget local edits that never reached the channel.
    ///
    /// A lost document replacement will never echo back, so editing resumes
    /// on the current document.
    pub fn discard_lost(&mut self, lost: &[Operation]) {
        self.coalescer.discard(lost);
        if lost
            .iter()
            .any(|op| matches!(op, Operation::NewDocument(_)))
        {
            self.editable = true;
        }
        self.dirty = true;
    }

    /// Flush what is pending and stop queueing.
    pub fn close(&mut self) {
        self.coalescer.flush(true);
        self.coalescer.close();
    }
}

/// Cloneable handle on the shared [`SyncState`].
///
/// Every method takes the lock for the duration of one call, so local input,
/// remote application and the flush timer never interleave.
#[derive(Debug, Clone)]
pub struct Engine {
    state: Arc<Mutex<SyncState>>,
}

impl Engine {
    pub fn new(state: SyncState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Run `f` with exclusive access to the state.
    pub fn with<R>(&self, f: impl FnOnce(&mut SyncState) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn type_char(&self, ch: char) {
        self.lock().type_char(ch);
    }

    pub fn backspace(&self) {
        self.lock().backspace();
    }

    pub fn delete_forward(&self) {
        self.lock().delete_forward();
    }

    pub fn split_line(&self) {
        self.lock().split_line();
    }

    pub fn move_cursor(&self, direction: Direction) {
        self.lock().move_cursor(direction);
    }

    pub fn move_home(&self) {
        self.lock().move_home();
    }

    pub fn move_end(&self) {
        self.lock().move_end();
    }

    pub fn move_to(&self, target: Cursor) {
        self.lock().move_to(target);
    }

    pub fn tick(&self) {
        self.lock().tick();
    }

    pub fn request_new_document(&self, content: impl Into<String>) {
        self.lock().request_new_document(content);
    }

    pub fn discard_lost(&self, lost: &[Operation]) {
        self.lock().discard_lost(lost);
    }

    pub fn close(&self) {
        self.lock().close();
    }

    pub fn apply_delivered(&self, delivered: &Delivered) -> bool {
        self.lock().apply_delivered(delivered)
    }

    pub fn rendered_lines(&self) -> Vec<Vec<u8>> {
        self.lock().rendered_lines()
    }

    /// Canonical document text, `\n`-joined.
    pub fn document_text(&self) -> Vec<u8> {
        self.lock().document().text()
    }

    pub fn local_cursor(&self) -> Cursor {
        self.lock().local_cursor()
    }

    pub fn cursor_for(&self, client_id: &str) -> Option<Cursor> {
        self.lock().cursor_for(client_id)
    }

    pub fn remote_cursors(&self) -> Vec<(String, Cursor)> {
        self.lock().remote_cursors()
    }

    pub fn is_editable(&self) -> bool {
        self.lock().is_editable()
    }

    pub fn take_dirty(&self) -> bool {
        self.lock().take_dirty()
    }
}
