//! Markers: positions in a root's text that move with edits.
//!
//! Every view keeps its point and narrowing bounds as markers in its root's
//! [`MarkerSet`], which is what lets a root and all of its indirect views keep
//! independent positions over one shared text. User markers live in the same
//! set but are the only ones whose displacement by a deletion is recorded for
//! undo.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub(crate) u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Created through the marker API.
    User,
    /// Point or narrowing bound of a view.
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub position: usize,
    /// Insertion exactly at `position` moves the marker past the new text.
    pub advances: bool,
    pub kind: MarkerKind,
}

/// Displacement of a user marker caused by a deletion, stored with the
/// `Delete` undo record so undo can put the marker back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerAdjustment {
    pub marker: MarkerId,
    /// Subtracted from the marker's position once the deleted text is back.
    pub adjustment: isize,
}

#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    markers: BTreeMap<MarkerId, Marker>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: MarkerId, marker: Marker) {
        self.markers.insert(id, marker);
    }

    pub fn remove(&mut self, id: MarkerId) -> Option<Marker> {
        self.markers.remove(&id)
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn position(&self, id: MarkerId) -> Option<usize> {
        self.markers.get(&id).map(|m| m.position)
    }

    pub fn set_position(&mut self, id: MarkerId, position: usize) {
        if let Some(m) = self.markers.get_mut(&id) {
            m.position = position;
        }
    }

    pub fn set_advances(&mut self, id: MarkerId, advances: bool) {
        if let Some(m) = self.markers.get_mut(&id) {
            m.advances = advances;
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// True if any user marker sits at `pos`.
    pub fn has_user_marker_at(&self, pos: usize) -> bool {
        self.markers
            .values()
            .any(|m| m.kind == MarkerKind::User && m.position == pos)
    }

    pub fn adjust_for_insert(&mut self, pos: usize, len: usize) {
        for m in self.markers.values_mut() {
            if m.position > pos || (m.position == pos && m.advances) {
                m.position += len;
            }
        }
    }

    pub fn adjust_for_delete(&mut self, from: usize, to: usize) {
        let len = to - from;
        for m in self.markers.values_mut() {
            if m.position > to {
                m.position -= len;
            } else if m.position > from {
                m.position = from;
            }
        }
    }

    /// Adjustments needed to restore user markers inside `[from, to]` after
    /// the deletion of that range is undone. Markers that the re-insertion
    /// will put back on their own are skipped.
    pub fn adjustments_for_delete(&self, from: usize, to: usize) -> Vec<MarkerAdjustment> {
        self.markers
            .iter()
            .filter(|(_, m)| m.kind == MarkerKind::User && (from..=to).contains(&m.position))
            .filter_map(|(id, m)| {
                let anchor = if m.advances { to } else { from };
                let adjustment = anchor as isize - m.position as isize;
                (adjustment != 0).then_some(MarkerAdjustment {
                    marker: *id,
                    adjustment,
                })
            })
            .collect()
    }
}
