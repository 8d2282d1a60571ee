//! Undo recording, replay and truncation on the registry.

use tracing::{debug, warn};

use super::Buffers;
use crate::error::{Error, Result};
use crate::marker::MarkerAdjustment;
use crate::undo::{Truncation, UndoEntry};
use crate::value::{Symbol, Value};
use crate::view::{Backing, BufferView, ViewId};

impl Buffers {
    /// Close the current undo group of `view`'s root.
    pub fn undo_boundary(&mut self, view: ViewId) -> Result<()> {
        self.shared_mut(view)?.undo.boundary();
        Ok(())
    }

    /// Record that `property` over `[pos, pos + length)` had `old_value`
    /// before a change the caller is about to make. Fires the first-change
    /// hook when the text is unmodified; a no-op record while undo is
    /// disabled.
    pub fn record_property_change(
        &mut self,
        view: ViewId,
        pos: usize,
        length: usize,
        property: impl Into<Symbol>,
        old_value: impl Into<Value>,
    ) -> Result<()> {
        let end = pos
            .checked_add(length)
            .ok_or_else(|| Error::InvalidArgument(format!("length {length} overflows")))?;
        self.notifier(view)?
            .property_changed(pos, end, property.into(), old_value.into())
    }

    pub fn disable_undo(&mut self, view: ViewId) -> Result<()> {
        self.shared_mut(view)?.undo.disable();
        Ok(())
    }

    /// Re-enable undo; a previously disabled log starts empty.
    pub fn enable_undo(&mut self, view: ViewId) -> Result<()> {
        self.shared_mut(view)?.undo.enable();
        Ok(())
    }

    pub fn undo_enabled(&self, view: ViewId) -> Result<bool> {
        Ok(self.shared(view)?.undo.is_enabled())
    }

    pub fn clear_undo(&mut self, view: ViewId) -> Result<()> {
        self.shared_mut(view)?.undo.clear();
        Ok(())
    }

    /// Undo records of `view`'s root, newest first.
    pub fn undo_entries(&self, view: ViewId) -> Result<Vec<UndoEntry>> {
        Ok(self.shared(view)?.undo.iter().cloned().collect())
    }

    /// Total storage cost of the undo log.
    pub fn undo_size(&self, view: ViewId) -> Result<usize> {
        Ok(self.shared(view)?.undo.size())
    }

    /// Undo one group of changes through `view`.
    ///
    /// Consecutive calls walk further back through the log; any change made
    /// in between restarts from the most recent group. The inverse edits are
    /// recorded, so the undo itself can be undone. A failure partway leaves
    /// the records already replayed in effect and does not advance the
    /// cursor, so the same group is tried again next time.
    pub fn undo(&mut self, view: ViewId) -> Result<()> {
        let root = self.root_id(view)?;
        let (group, resume) = {
            let log = &mut self.shared_mut(root)?.undo;
            if !log.is_enabled() {
                return Err(Error::Disabled);
            }
            log.boundary();
            let resume = log.pending();
            (log.next_undo_group()?, resume)
        };
        debug!(target: "state.undo", view = %view, records = group.len(), "undo_group_replay");
        self.shared_mut(root)?.undo.begin_replay();
        let result = group
            .into_iter()
            .try_for_each(|entry| self.replay(view, root, entry));
        let log = &mut self.shared_mut(root)?.undo;
        log.end_replay();
        log.boundary();
        if let Err(e) = &result {
            log.rewind_pending(resume);
            warn!(target: "state.undo", view = %view, error = %e, "undo_replay_failed");
        }
        result
    }

    fn replay(&mut self, view: ViewId, root: ViewId, entry: UndoEntry) -> Result<()> {
        match entry {
            UndoEntry::Insert { pos, length } => {
                let end = pos + length;
                self.check_undo_range(view, pos, end)?;
                self.notifier(view)?.delete(pos, end)?;
                self.goto_char(view, pos)?;
            }
            UndoEntry::Delete {
                pos,
                text,
                adjust_markers,
            } => {
                self.check_undo_range(view, pos, pos)?;
                let valid = self.restorable_adjustments(root, pos, &adjust_markers)?;
                self.insert_at(view, pos, &text)?;
                let shared = self.shared_mut(root)?;
                let len = shared.len();
                for adj in valid {
                    if let Some(current) = shared.markers.position(adj.marker) {
                        let restored = (current as isize - adj.adjustment).clamp(0, len as isize);
                        shared.markers.set_position(adj.marker, restored as usize);
                    }
                }
                self.goto_char(view, pos)?;
            }
            UndoEntry::PropertyChange {
                begin,
                end,
                property,
                old_value,
            } => {
                self.check_undo_range(view, begin, end)?;
                self.hooks
                    .restore_property(root, begin, end, &property, &old_value);
            }
            UndoEntry::Boundary => {}
        }
        Ok(())
    }

    /// Adjustments whose marker still sits where the deletion left it.
    fn restorable_adjustments(
        &self,
        root: ViewId,
        pos: usize,
        adjustments: &[MarkerAdjustment],
    ) -> Result<Vec<MarkerAdjustment>> {
        let markers = &self.shared(root)?.markers;
        Ok(adjustments
            .iter()
            .filter(|adj| markers.position(adj.marker) == Some(pos))
            .copied()
            .collect())
    }

    fn check_undo_range(&self, view: ViewId, begin: usize, end: usize) -> Result<()> {
        let (_, begv, zv) = self.positions(view)?;
        if begin < begv || end > zv {
            return Err(Error::InvalidArgument(
                "changes to be undone are outside visible portion of buffer".into(),
            ));
        }
        Ok(())
    }

    /// Truncate the undo log of `view`'s root against the registry's limits.
    /// The root is current while the outer-limit handler runs.
    pub fn truncate_undo(&mut self, view: ViewId) -> Result<Truncation> {
        let root = self.root_id(view)?;
        self.with_current(root, |b| {
            let Buffers { views, limits, .. } = b;
            match views.get_mut(root.0).and_then(Option::as_mut) {
                Some(BufferView {
                    backing: Backing::Owned(shared),
                    ..
                }) => shared.undo.truncate(limits),
                _ => Err(Error::NotFound(root)),
            }
        })
    }

    /// Truncate the undo log of every live root, as a memory-reclamation
    /// pass would. Returns what happened to each.
    pub fn reclaim(&mut self) -> Result<Vec<(ViewId, Truncation)>> {
        let roots = self.root_list();
        let mut outcomes = Vec::with_capacity(roots.len());
        for root in roots {
            outcomes.push((root, self.truncate_undo(root)?));
        }
        debug!(target: "state.undo", roots = outcomes.len(), "reclaim_complete");
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use crate::buffers::Buffers;
    use crate::error::Error;
    use crate::undo::{Truncation, UndoEntry, UndoLimits};
    use pretty_assertions::assert_eq;

    #[test]
    fn undo_reverts_one_command_at_a_time() {
        let mut b = Buffers::new();
        let v = b.create_root("v");
        b.insert(v, "hello").unwrap();
        b.undo_boundary(v).unwrap();
        b.insert(v, " world").unwrap();
        b.undo_boundary(v).unwrap();
        b.undo(v).unwrap();
        assert_eq!(b.full_text(v).unwrap(), "hello");
        b.undo(v).unwrap();
        assert_eq!(b.full_text(v).unwrap(), "");
        assert_eq!(b.undo(v), Err(Error::NoFurtherUndo));
    }

    #[test]
    fn undoing_an_undo_redoes() {
        let mut b = Buffers::new();
        let v = b.create_root("v");
        b.insert(v, "abc").unwrap();
        b.undo_boundary(v).unwrap();
        b.undo(v).unwrap();
        assert_eq!(b.full_text(v).unwrap(), "");
        // Any other change breaks the undo chain; the next undo then
        // reverts the previous undo.
        b.record_property_change(v, 0, 0, "face", "plain").unwrap();
        b.undo_boundary(v).unwrap();
        b.undo(v).unwrap();
        b.undo(v).unwrap();
        assert_eq!(b.full_text(v).unwrap(), "abc");
    }

    #[test]
    fn undo_of_delete_restores_text_and_point() {
        let mut b = Buffers::new();
        let v = b.create_root("v");
        b.insert(v, "0123456789").unwrap();
        b.undo_boundary(v).unwrap();
        b.delete_region(v, 2, 5).unwrap();
        b.undo_boundary(v).unwrap();
        b.undo(v).unwrap();
        assert_eq!(b.full_text(v).unwrap(), "0123456789");
        assert_eq!(b.point(v).unwrap(), 2);
    }

    #[test]
    fn undo_outside_narrowing_is_rejected() {
        let mut b = Buffers::new();
        let v = b.create_root("v");
        b.insert(v, "0123456789").unwrap();
        b.undo_boundary(v).unwrap();
        b.narrow(v, 0, 2).unwrap();
        assert!(matches!(b.undo(v), Err(Error::InvalidArgument(_))));
        b.widen(v).unwrap();
        b.undo(v).unwrap();
        assert_eq!(b.full_text(v).unwrap(), "");
    }

    #[test]
    fn disabled_undo_records_nothing_and_reports_disabled() {
        let mut b = Buffers::new();
        let v = b.create_root("v");
        b.disable_undo(v).unwrap();
        b.insert(v, "abc").unwrap();
        b.record_property_change(v, 0, 1, "face", "x").unwrap();
        assert_eq!(b.undo_entries(v).unwrap(), Vec::<UndoEntry>::new());
        assert_eq!(b.undo(v), Err(Error::Disabled));
        b.enable_undo(v).unwrap();
        assert!(b.undo_enabled(v).unwrap());
        assert_eq!(b.undo_size(v).unwrap(), 0);
    }

    #[test]
    fn property_change_is_validated_and_recorded() {
        let mut b = Buffers::new();
        let v = b.create_root("v");
        b.insert(v, "abc").unwrap();
        assert!(matches!(
            b.record_property_change(v, 2, 5, "face", "x"),
            Err(Error::InvalidArgument(_))
        ));
        b.record_property_change(v, 1, 2, "face", "x").unwrap();
        assert!(matches!(
            b.undo_entries(v).unwrap().first(),
            Some(UndoEntry::PropertyChange { begin: 1, end: 3, .. })
        ));
    }

    #[test]
    fn truncate_undo_uses_registry_limits() {
        let mut b = Buffers::with_limits(UndoLimits::new(10, 20, None).unwrap());
        let v = b.create_root("v");
        for word in ["one ", "two ", "three "] {
            b.insert(v, word).unwrap();
            b.undo_boundary(v).unwrap();
        }
        let before = b.undo_entries(v).unwrap().len();
        assert!(matches!(
            b.truncate_undo(v).unwrap(),
            Truncation::Severed { .. }
        ));
        let after = b.undo_entries(v).unwrap();
        assert!(after.len() < before);
        assert_eq!(
            after,
            vec![UndoEntry::Boundary, UndoEntry::Insert { pos: 8, length: 6 }]
        );
        assert_eq!(b.reclaim().unwrap(), vec![(v, Truncation::Unchanged)]);
    }
}
