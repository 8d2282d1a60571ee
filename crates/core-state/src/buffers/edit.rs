//! Text edits made through a view.

use tracing::debug;

use super::Buffers;
use crate::error::Result;
use crate::view::ViewId;

impl Buffers {
    /// Insert `text` at point; point ends up after the inserted text.
    /// Returns the number of characters inserted.
    pub fn insert(&mut self, view: ViewId, text: &str) -> Result<usize> {
        let point = self.point(view)?;
        let inserted = self.insert_at(view, point, text)?;
        let markers = self.view(view)?.markers;
        self.shared_mut(view)?
            .markers
            .set_position(markers.point, point + inserted);
        Ok(inserted)
    }

    /// Insert at `pos` without moving this view's point past the text.
    /// `pos` must be in the accessible range.
    pub(crate) fn insert_at(&mut self, view: ViewId, pos: usize, text: &str) -> Result<usize> {
        let (pos, _) = self.accessible_range(view, pos, pos)?;
        self.notifier(view)?.insert(pos, text)
    }

    /// Delete `[begin, end)` (bounds in either order), which must lie in
    /// the accessible range. Returns the deleted text.
    pub fn delete_region(&mut self, view: ViewId, begin: usize, end: usize) -> Result<String> {
        let (begin, end) = self.accessible_range(view, begin, end)?;
        self.notifier(view)?.delete(begin, end)
    }

    /// Widen `view` and delete the whole text. The deletion is recorded for
    /// undo and shifts overlays and markers like any other. A read-only
    /// view is left narrowed.
    pub fn erase(&mut self, view: ViewId) -> Result<()> {
        self.barf_if_read_only(view)?;
        self.widen(view)?;
        let len = self.buffer_size(view)?;
        self.notifier(view)?.delete(0, len)?;
        debug!(target: "state.buffer", view = %view, erased = len, "buffer_erased");
        Ok(())
    }
}
