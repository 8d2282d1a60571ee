//! Buffer views and the per-root state they share.
//!
//! A root view owns a [`SharedText`]: the text store, overlays, markers, undo
//! log and modification state. An indirect view holds only the id of its root
//! and reaches everything through it; a root is never itself indirect, so the
//! lookup is always one hop.

use std::fmt;
use std::path::PathBuf;

use core_text::TextStore;

use crate::marker::{Marker, MarkerId, MarkerKind, MarkerSet};
use crate::overlay::OverlaySet;
use crate::undo::UndoLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub(crate) usize);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a view's text lives.
#[derive(Debug)]
pub(crate) enum Backing {
    Owned(Box<SharedText>),
    Indirect(ViewId),
}

/// Point and narrowing bounds of one view, as markers in its root's set.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ViewMarkers {
    pub point: MarkerId,
    pub begv: MarkerId,
    pub zv: MarkerId,
}

#[derive(Debug)]
pub struct BufferView {
    pub(crate) id: ViewId,
    pub(crate) name: String,
    pub(crate) backing: Backing,
    pub(crate) markers: ViewMarkers,
    pub(crate) read_only: bool,
}

impl BufferView {
    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` for a root view, the root's id for an indirect one.
    pub fn root(&self) -> Option<ViewId> {
        match self.backing {
            Backing::Owned(_) => None,
            Backing::Indirect(root) => Some(root),
        }
    }

    pub fn is_indirect(&self) -> bool {
        matches!(self.backing, Backing::Indirect(_))
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

/// State shared by a root and every indirect view of it.
#[derive(Debug, Default)]
pub struct SharedText {
    pub(crate) store: TextStore,
    pub(crate) overlays: OverlaySet,
    pub(crate) markers: MarkerSet,
    pub(crate) undo: UndoLog,
    /// Bumped by every change.
    pub(crate) modiff: u64,
    /// Bumped by text changes only.
    pub(crate) chars_modiff: u64,
    /// `modiff` at the last save; the root is unmodified while they match.
    pub(crate) save_modiff: u64,
    pub(crate) file: Option<PathBuf>,
    pub(crate) locked: bool,
}

impl SharedText {
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn is_modified(&self) -> bool {
        self.modiff > self.save_modiff
    }

    pub(crate) fn add_view_markers(&mut self, ids: ViewMarkers, point: usize, begv: usize, zv: usize) {
        let view_marker = |position, advances| Marker {
            position,
            advances,
            kind: MarkerKind::View,
        };
        self.markers.insert(ids.point, view_marker(point, false));
        self.markers.insert(ids.begv, view_marker(begv, false));
        self.markers.insert(ids.zv, view_marker(zv, true));
    }

    pub(crate) fn remove_view_markers(&mut self, ids: ViewMarkers) {
        self.markers.remove(ids.point);
        self.markers.remove(ids.begv);
        self.markers.remove(ids.zv);
    }

    /// `(point, begv, zv)` of a view, clamped to the text.
    pub(crate) fn view_positions(&self, ids: ViewMarkers) -> (usize, usize, usize) {
        let len = self.len();
        let begv = self.markers.position(ids.begv).unwrap_or(0).min(len);
        let zv = self.markers.position(ids.zv).unwrap_or(len).clamp(begv, len);
        let point = self.markers.position(ids.point).unwrap_or(begv).clamp(begv, zv);
        (point, begv, zv)
    }
}
