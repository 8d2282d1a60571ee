//! Edit transactions over one root's shared state.
//!
//! Every text or property change goes through a [`ChangeNotifier`], which
//! runs the same sequence each time:
//!
//! 1. validate the coordinates and refuse read-only text (nothing is
//!    touched on failure);
//! 2. take the file lock if this is the first change to a visited, unmodified
//!    root (a lock failure aborts before the text changes);
//! 3. mutate the text store;
//! 4. shift markers and overlays;
//! 5. fire the first-change hook, then append the undo record;
//! 6. bump the modification ticks.
//!
//! Control returns to the caller only once all of this is done, so observers
//! never see text whose overlays or undo history lag behind.

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::hooks::ChangeHooks;
use crate::lock::LockProtocol;
use crate::undo::UndoEntry;
use crate::value::{Symbol, Value};
use crate::view::{SharedText, ViewId};

pub struct ChangeNotifier<'a> {
    root: ViewId,
    read_only: bool,
    shared: &'a mut SharedText,
    hooks: &'a mut dyn ChangeHooks,
    lock: &'a mut dyn LockProtocol,
}

impl<'a> ChangeNotifier<'a> {
    pub(crate) fn new(
        root: ViewId,
        read_only: bool,
        shared: &'a mut SharedText,
        hooks: &'a mut dyn ChangeHooks,
        lock: &'a mut dyn LockProtocol,
    ) -> Self {
        Self {
            root,
            read_only,
            shared,
            hooks,
            lock,
        }
    }

    /// Insert `text` at `pos`; returns the number of characters inserted.
    pub fn insert(&mut self, pos: usize, text: &str) -> Result<usize> {
        let len = self.shared.len();
        if pos > len {
            return Err(Error::out_of_range(pos, pos, 0, len));
        }
        if text.is_empty() {
            return Ok(0);
        }
        self.prepare()?;
        let inserted = self.shared.store.insert(pos, text);
        self.shared.markers.adjust_for_insert(pos, inserted);
        self.shared.overlays.adjust_for_insert(pos, inserted);
        self.first_change();
        self.shared.undo.record_insert(pos, inserted);
        self.bump(true);
        trace!(target: "state.buffer", root = %self.root, pos, inserted, "text_inserted");
        Ok(inserted)
    }

    /// Delete `[from, to)`; returns the removed text.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<String> {
        let len = self.shared.len();
        if from > to || to > len {
            return Err(Error::out_of_range(from, to, 0, len));
        }
        if from == to {
            return Ok(String::new());
        }
        self.prepare()?;
        let adjust_markers = if self.shared.undo.accepts_records() {
            self.shared.markers.adjustments_for_delete(from, to)
        } else {
            Vec::new()
        };
        let text = self.shared.store.remove(from..to);
        self.shared.markers.adjust_for_delete(from, to);
        self.shared.overlays.adjust_for_delete(from, to);
        self.first_change();
        self.shared.undo.record(UndoEntry::Delete {
            pos: from,
            text: text.clone(),
            adjust_markers,
        });
        self.bump(true);
        trace!(target: "state.buffer", root = %self.root, from, to, "text_deleted");
        Ok(text)
    }

    /// Record that `property` over `[begin, end)` held `old_value` before a
    /// change made by the caller.
    pub fn property_changed(
        &mut self,
        begin: usize,
        end: usize,
        property: Symbol,
        old_value: Value,
    ) -> Result<()> {
        let len = self.shared.len();
        if begin > end || end > len {
            return Err(Error::out_of_range(begin, end, 0, len));
        }
        self.prepare()?;
        self.first_change();
        self.shared.undo.record(UndoEntry::PropertyChange {
            begin,
            end,
            property,
            old_value,
        });
        self.bump(false);
        Ok(())
    }

    fn prepare(&mut self) -> Result<()> {
        if self.read_only && !self.shared.undo.is_replaying() {
            debug!(target: "state.buffer", root = %self.root, "change_rejected_read_only");
            return Err(crate::buffers::read_only_error(self.root));
        }
        if self.shared.is_modified() || self.shared.locked {
            return Ok(());
        }
        let Some(path) = self.shared.file.as_deref() else {
            return Ok(());
        };
        if let Err(e) = self.lock.lock(self.root, path) {
            debug!(target: "state.buffer", root = %self.root, path = %path.display(), error = %e, "lock_failed");
            return Err(Error::Lock(format!("{e:#}")));
        }
        self.shared.locked = true;
        Ok(())
    }

    fn first_change(&mut self) {
        if self.shared.undo.accepts_records() && !self.shared.is_modified() {
            self.hooks.first_change(self.root);
        }
    }

    fn bump(&mut self, text_changed: bool) {
        self.shared.modiff += 1;
        if text_changed {
            self.shared.chars_modiff = self.shared.modiff;
        }
    }
}
