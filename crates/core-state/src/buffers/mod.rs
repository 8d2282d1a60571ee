//! The buffer registry: every live view, the current view, and the
//! collaborators edits are reported to.
//!
//! Views are stored in creation order in a slot vector indexed by
//! [`ViewId`]; killing a view empties its slot and ids are never handed out
//! again, so a stale id reliably yields [`Error::NotFound`]. Text-changing
//! operations live in `edit`, overlays in `overlays`, user markers in
//! `markers` and undo in `undo`.

mod edit;
mod markers;
mod overlays;
mod undo;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::hooks::{ChangeHooks, NoopChangeHooks};
use crate::lock::{LockProtocol, LockState, NoLocking};
use crate::marker::MarkerId;
use crate::notify::ChangeNotifier;
use crate::overlay::{Overlay, OverlayId};
use crate::undo::UndoLimits;
use crate::view::{Backing, BufferView, SharedText, ViewId, ViewMarkers};

/// Where a user marker currently points.
#[derive(Debug, Clone, Copy)]
struct UserMarker {
    /// View it was set in and that view's root; `None` when detached.
    home: Option<(ViewId, ViewId)>,
    advances: bool,
}

#[derive(Debug)]
enum OverlayHome {
    Attached(ViewId),
    /// Deleted overlays keep their properties.
    Detached(Overlay),
}

pub struct Buffers {
    views: Vec<Option<BufferView>>,
    current: Option<ViewId>,
    limits: UndoLimits,
    hooks: Box<dyn ChangeHooks>,
    lock: Box<dyn LockProtocol>,
    next_marker: u64,
    /// Every marker ever made. Entries outlive the views they pointed into
    /// so an old id still answers "nowhere" rather than `WrongType`.
    user_markers: HashMap<MarkerId, UserMarker>,
    next_overlay: u64,
    /// Every overlay ever made, deleted ones included; their properties
    /// stay readable.
    overlay_homes: HashMap<OverlayId, OverlayHome>,
    inhibit_read_only: bool,
}

impl Default for Buffers {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffers {
    pub fn new() -> Self {
        Self::with_limits(UndoLimits::default())
    }

    pub fn with_limits(limits: UndoLimits) -> Self {
        Self {
            views: Vec::new(),
            current: None,
            limits,
            hooks: Box::new(NoopChangeHooks),
            lock: Box::new(NoLocking),
            next_marker: 0,
            user_markers: HashMap::new(),
            next_overlay: 0,
            overlay_homes: HashMap::new(),
            inhibit_read_only: false,
        }
    }

    pub fn set_hooks(&mut self, hooks: Box<dyn ChangeHooks>) {
        self.hooks = hooks;
    }

    pub fn set_lock_protocol(&mut self, lock: Box<dyn LockProtocol>) {
        self.lock = lock;
    }

    pub fn limits(&self) -> &UndoLimits {
        &self.limits
    }

    pub fn limits_mut(&mut self) -> &mut UndoLimits {
        &mut self.limits
    }

    pub fn set_limits(&mut self, limits: UndoLimits) {
        self.limits = limits;
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create a root view with empty text. `name` is made unique by
    /// appending `<2>`, `<3>`, ...
    pub fn create_root(&mut self, name: &str) -> ViewId {
        let id = ViewId(self.views.len());
        let name = self.unique_name(name);
        let markers = self.alloc_view_markers();
        let mut shared = SharedText::default();
        shared.add_view_markers(markers, 0, 0, 0);
        self.views.push(Some(BufferView {
            id,
            name,
            backing: Backing::Owned(Box::new(shared)),
            markers,
            read_only: false,
        }));
        self.current.get_or_insert(id);
        info!(target: "state.buffer", view = %id, "root_created");
        id
    }

    /// Create a view sharing `base`'s text, overlays and undo log, with its
    /// own point and narrowing copied from `base`.
    pub fn create_indirect(&mut self, base: ViewId, name: &str) -> Result<ViewId> {
        let base_view = self.view(base).map_err(|_| {
            Error::InvalidArgument(format!("base buffer {base} has been killed"))
        })?;
        if base_view.is_indirect() {
            return Err(Error::InvalidArgument(format!(
                "base buffer {base} is itself indirect"
            )));
        }
        let base_markers = base_view.markers;
        let id = ViewId(self.views.len());
        let name = self.unique_name(name);
        let markers = self.alloc_view_markers();
        let shared = self.shared_mut(base)?;
        let (point, begv, zv) = shared.view_positions(base_markers);
        shared.add_view_markers(markers, point, begv, zv);
        self.views.push(Some(BufferView {
            id,
            name,
            backing: Backing::Indirect(base),
            markers,
            read_only: false,
        }));
        info!(target: "state.buffer", view = %id, base = %base, "indirect_created");
        Ok(id)
    }

    /// Kill `view`. Killing a root kills its indirect views first, releases
    /// the file lock and detaches its overlays and markers.
    pub fn kill(&mut self, view: ViewId) -> Result<()> {
        let root = self.view(view)?.root();
        match root {
            Some(root) => {
                let markers = self.view(view)?.markers;
                self.shared_mut(root)?.remove_view_markers(markers);
            }
            None => {
                let indirect: Vec<ViewId> = self
                    .live_views()
                    .filter(|v| v.root() == Some(view))
                    .map(BufferView::id)
                    .collect();
                for id in indirect {
                    self.kill(id)?;
                }
                let shared = self.shared_mut(view)?;
                let file = shared.file.clone();
                let was_locked = std::mem::take(&mut shared.locked);
                let detached = shared.overlays.drain();
                if was_locked && let Some(path) = file {
                    self.lock.unlock(view, &path);
                }
                for (id, overlay) in detached {
                    self.overlay_homes.insert(id, OverlayHome::Detached(overlay));
                }
            }
        }
        let mut orphaned = Vec::new();
        for (id, marker) in self.user_markers.iter_mut() {
            if let Some((home_view, home_root)) = marker.home
                && (home_view == view || home_root == view)
            {
                marker.home = None;
                orphaned.push(*id);
            }
        }
        if let Some(root) = root {
            let shared = self.shared_mut(root)?;
            for id in orphaned {
                shared.markers.remove(id);
            }
        }
        self.views[view.0] = None;
        if self.current == Some(view) {
            let next = self.live_views().map(BufferView::id).next();
            self.current = next;
        }
        info!(target: "state.buffer", view = %view, "view_killed");
        Ok(())
    }

    pub fn is_live(&self, view: ViewId) -> bool {
        matches!(self.views.get(view.0), Some(Some(_)))
    }

    /// `None` for a root view, the root for an indirect view.
    pub fn root_of(&self, view: ViewId) -> Result<Option<ViewId>> {
        Ok(self.view(view)?.root())
    }

    /// Live views in creation order.
    pub fn buffer_list(&self) -> Vec<ViewId> {
        self.live_views().map(BufferView::id).collect()
    }

    /// Live root views in creation order.
    pub fn root_list(&self) -> Vec<ViewId> {
        self.live_views()
            .filter(|v| !v.is_indirect())
            .map(BufferView::id)
            .collect()
    }

    pub fn get_buffer(&self, name: &str) -> Option<ViewId> {
        self.live_views().find(|v| v.name == name).map(BufferView::id)
    }

    pub fn name(&self, view: ViewId) -> Result<&str> {
        Ok(self.view(view)?.name())
    }

    // ------------------------------------------------------------------
    // Current view
    // ------------------------------------------------------------------

    pub fn current(&self) -> Option<ViewId> {
        self.current
    }

    pub fn set_current(&mut self, view: ViewId) -> Result<()> {
        self.view(view)?;
        self.current = Some(view);
        Ok(())
    }

    /// Run `f` with `view` current, then restore the previously current
    /// view if it is still live. Restoration happens on `Err` too.
    pub fn with_current<T, F>(&mut self, view: ViewId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.view(view)?;
        let previous = self.current.replace(view);
        let result = f(self);
        match previous {
            Some(prev) if self.is_live(prev) => self.current = Some(prev),
            _ => {
                if !self.current.is_some_and(|c| self.is_live(c)) {
                    let next = self.live_views().map(BufferView::id).next();
                    self.current = next;
                }
            }
        }
        result
    }

    // ------------------------------------------------------------------
    // Narrowing and point
    // ------------------------------------------------------------------

    /// Restrict `view` to `[begin, end)` (bounds in either order). Point is
    /// clamped into the new range.
    pub fn narrow(&mut self, view: ViewId, begin: usize, end: usize) -> Result<()> {
        let (begin, end) = if begin <= end { (begin, end) } else { (end, begin) };
        let markers = self.view(view)?.markers;
        let root = self.root_id(view)?;
        let shared = self.shared_mut(root)?;
        let len = shared.len();
        if end > len {
            return Err(Error::out_of_range(begin, end, 0, len));
        }
        let (point, _, _) = shared.view_positions(markers);
        shared.markers.set_position(markers.begv, begin);
        shared.markers.set_position(markers.zv, end);
        shared.markers.set_position(markers.point, point.clamp(begin, end));
        debug!(target: "state.buffer", view = %view, begin, end, "narrowed");
        Ok(())
    }

    pub fn widen(&mut self, view: ViewId) -> Result<()> {
        let markers = self.view(view)?.markers;
        let shared = self.shared_mut(view)?;
        let len = shared.len();
        shared.markers.set_position(markers.begv, 0);
        shared.markers.set_position(markers.zv, len);
        Ok(())
    }

    pub fn is_narrowed(&self, view: ViewId) -> Result<bool> {
        let (_, begv, zv) = self.positions(view)?;
        Ok(begv != 0 || zv != self.buffer_size(view)?)
    }

    pub fn point(&self, view: ViewId) -> Result<usize> {
        Ok(self.positions(view)?.0)
    }

    /// Move point, clamped to the accessible range. Returns the new point.
    pub fn goto_char(&mut self, view: ViewId, pos: usize) -> Result<usize> {
        let markers = self.view(view)?.markers;
        let shared = self.shared_mut(view)?;
        let (_, begv, zv) = shared.view_positions(markers);
        let pos = pos.clamp(begv, zv);
        shared.markers.set_position(markers.point, pos);
        Ok(pos)
    }

    pub fn point_min(&self, view: ViewId) -> Result<usize> {
        Ok(self.positions(view)?.1)
    }

    pub fn point_max(&self, view: ViewId) -> Result<usize> {
        Ok(self.positions(view)?.2)
    }

    /// Length of the whole text, ignoring narrowing.
    pub fn buffer_size(&self, view: ViewId) -> Result<usize> {
        Ok(self.shared(view)?.len())
    }

    pub fn bobp(&self, view: ViewId) -> Result<bool> {
        let (point, begv, _) = self.positions(view)?;
        Ok(point == begv)
    }

    pub fn eobp(&self, view: ViewId) -> Result<bool> {
        let (point, _, zv) = self.positions(view)?;
        Ok(point == zv)
    }

    pub fn bolp(&self, view: ViewId) -> Result<bool> {
        let (point, begv, _) = self.positions(view)?;
        Ok(point == begv || self.shared(view)?.store.is_line_start(point))
    }

    pub fn eolp(&self, view: ViewId) -> Result<bool> {
        let (point, _, zv) = self.positions(view)?;
        Ok(point == zv || self.shared(view)?.store.is_line_end(point))
    }

    // ------------------------------------------------------------------
    // Text queries
    // ------------------------------------------------------------------

    /// Accessible text of `view`.
    pub fn text(&self, view: ViewId) -> Result<String> {
        let (_, begv, zv) = self.positions(view)?;
        Ok(self.shared(view)?.store.slice(begv..zv))
    }

    pub fn full_text(&self, view: ViewId) -> Result<String> {
        Ok(self.shared(view)?.store.to_string())
    }

    /// Text of `[begin, end)`, which must lie in the accessible range.
    pub fn substring(&self, view: ViewId, begin: usize, end: usize) -> Result<String> {
        let (begin, end) = self.accessible_range(view, begin, end)?;
        Ok(self.shared(view)?.store.slice(begin..end))
    }

    /// Character after `pos`, `None` outside the accessible range.
    pub fn char_after(&self, view: ViewId, pos: usize) -> Result<Option<char>> {
        let (_, begv, zv) = self.positions(view)?;
        if pos < begv || pos >= zv {
            return Ok(None);
        }
        Ok(self.shared(view)?.store.char_at(pos))
    }

    // ------------------------------------------------------------------
    // Read-only state
    // ------------------------------------------------------------------

    /// Read-only is per view: an indirect view may be read-only while its
    /// root is not.
    pub fn set_read_only(&mut self, view: ViewId, read_only: bool) -> Result<()> {
        self.view_mut(view)?.read_only = read_only;
        Ok(())
    }

    pub fn is_read_only(&self, view: ViewId) -> Result<bool> {
        Ok(self.view(view)?.read_only)
    }

    /// While set, read-only views accept changes.
    pub fn set_inhibit_read_only(&mut self, inhibit: bool) {
        self.inhibit_read_only = inhibit;
    }

    pub fn inhibit_read_only(&self) -> bool {
        self.inhibit_read_only
    }

    /// `InvalidArgument` when `view` is read-only and read-only is not
    /// inhibited.
    pub fn barf_if_read_only(&self, view: ViewId) -> Result<()> {
        if self.view(view)?.read_only && !self.inhibit_read_only {
            return Err(read_only_error(view));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Modification state and visited file
    // ------------------------------------------------------------------

    pub fn is_modified(&self, view: ViewId) -> Result<bool> {
        Ok(self.shared(view)?.is_modified())
    }

    /// Mark the text as saved; releases the file lock if held.
    pub fn set_unmodified(&mut self, view: ViewId) -> Result<()> {
        let root = self.root_id(view)?;
        let shared = self.shared_mut(root)?;
        shared.save_modiff = shared.modiff;
        if std::mem::take(&mut shared.locked)
            && let Some(path) = shared.file.clone()
        {
            self.lock.unlock(root, &path);
        }
        Ok(())
    }

    /// Counter bumped by every change to the text or its recorded properties.
    pub fn modified_tick(&self, view: ViewId) -> Result<u64> {
        Ok(self.shared(view)?.modiff)
    }

    /// Tick of the last change to the characters themselves.
    pub fn chars_modified_tick(&self, view: ViewId) -> Result<u64> {
        Ok(self.shared(view)?.chars_modiff)
    }

    /// Associate the root of `view` with `path` (or with nothing). The lock
    /// on the previous file is released; a modified text locks the new one.
    /// Visiting the file already visited changes nothing.
    pub fn set_visited_file(&mut self, view: ViewId, path: Option<PathBuf>) -> Result<()> {
        if self.view(view)?.is_indirect() {
            return Err(Error::InvalidArgument(format!(
                "indirect buffer {view} cannot visit a file"
            )));
        }
        let shared = self.shared(view)?;
        if shared.file == path {
            return Ok(());
        }
        let lock_new = shared.is_modified() && path.is_some();
        if lock_new && let Some(new) = path.as_deref() {
            self.lock
                .lock(view, new)
                .map_err(|e| Error::Lock(format!("{e:#}")))?;
        }
        let shared = self.shared_mut(view)?;
        let old = std::mem::replace(&mut shared.file, path);
        let was_locked = std::mem::replace(&mut shared.locked, lock_new);
        if was_locked && let Some(old) = old {
            self.lock.unlock(view, &old);
        }
        Ok(())
    }

    /// Live root visiting exactly `path`.
    pub fn get_file_buffer(&self, path: &Path) -> Option<ViewId> {
        self.live_views()
            .filter(|v| !v.is_indirect())
            .find(|v| {
                self.shared(v.id)
                    .is_ok_and(|shared| shared.file.as_deref() == Some(path))
            })
            .map(BufferView::id)
    }

    pub fn visited_file(&self, view: ViewId) -> Result<Option<&Path>> {
        Ok(self.shared(view)?.file.as_deref())
    }

    pub fn file_lock_state(&self, view: ViewId) -> Result<LockState> {
        Ok(match self.shared(view)?.file.as_deref() {
            Some(path) => self.lock.query(path),
            None => LockState::Unlocked,
        })
    }

    // ------------------------------------------------------------------
    // Internal lookups
    // ------------------------------------------------------------------

    fn live_views(&self) -> impl Iterator<Item = &BufferView> {
        self.views.iter().flatten()
    }

    pub(crate) fn view(&self, view: ViewId) -> Result<&BufferView> {
        self.views
            .get(view.0)
            .and_then(Option::as_ref)
            .ok_or(Error::NotFound(view))
    }

    fn view_mut(&mut self, view: ViewId) -> Result<&mut BufferView> {
        self.views
            .get_mut(view.0)
            .and_then(Option::as_mut)
            .ok_or(Error::NotFound(view))
    }

    /// Root of `view` (itself for a root view).
    pub(crate) fn root_id(&self, view: ViewId) -> Result<ViewId> {
        Ok(self.view(view)?.root().unwrap_or(view))
    }

    pub(crate) fn shared(&self, view: ViewId) -> Result<&SharedText> {
        let root = self.root_id(view)?;
        match &self.view(root)?.backing {
            Backing::Owned(shared) => Ok(&**shared),
            Backing::Indirect(_) => Err(Error::NotFound(root)),
        }
    }

    pub(crate) fn shared_mut(&mut self, view: ViewId) -> Result<&mut SharedText> {
        let root = self.root_id(view)?;
        match self.views.get_mut(root.0).and_then(Option::as_mut) {
            Some(BufferView {
                backing: Backing::Owned(shared),
                ..
            }) => Ok(&mut **shared),
            _ => Err(Error::NotFound(root)),
        }
    }

    /// Edit transaction on the root text of `view`. Coordinates are full-text
    /// positions; narrowing is not checked and no point is moved. A
    /// read-only `view` refuses every change except undo replay.
    pub fn notifier(&mut self, view: ViewId) -> Result<ChangeNotifier<'_>> {
        let root = self.root_id(view)?;
        let read_only = self.view(view)?.read_only && !self.inhibit_read_only;
        let shared = match self.views.get_mut(root.0).and_then(Option::as_mut) {
            Some(BufferView {
                backing: Backing::Owned(shared),
                ..
            }) => shared,
            _ => return Err(Error::NotFound(root)),
        };
        Ok(ChangeNotifier::new(
            root,
            read_only,
            &mut **shared,
            self.hooks.as_mut(),
            self.lock.as_mut(),
        ))
    }

    /// `(point, begv, zv)` of `view`.
    pub(crate) fn positions(&self, view: ViewId) -> Result<(usize, usize, usize)> {
        let markers = self.view(view)?.markers;
        Ok(self.shared(view)?.view_positions(markers))
    }

    /// Order `[begin, end)` and check it lies in the accessible range.
    pub(crate) fn accessible_range(
        &self,
        view: ViewId,
        begin: usize,
        end: usize,
    ) -> Result<(usize, usize)> {
        let (begin, end) = if begin <= end { (begin, end) } else { (end, begin) };
        let (_, begv, zv) = self.positions(view)?;
        if begin < begv || end > zv {
            return Err(Error::out_of_range(begin, end, begv, zv));
        }
        Ok((begin, end))
    }

    fn alloc_view_markers(&mut self) -> ViewMarkers {
        let mut next = || {
            let id = MarkerId(self.next_marker);
            self.next_marker += 1;
            id
        };
        ViewMarkers {
            point: next(),
            begv: next(),
            zv: next(),
        }
    }

    fn unique_name(&self, name: &str) -> String {
        if self.get_buffer(name).is_none() {
            return name.to_owned();
        }
        (2..)
            .map(|n| format!("{name}<{n}>"))
            .find(|candidate| self.get_buffer(candidate).is_none())
            .unwrap_or_else(|| name.to_owned())
    }
}

pub(crate) fn read_only_error(view: ViewId) -> Error {
    Error::InvalidArgument(format!("buffer {view} is read-only"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_root_becomes_current() {
        let mut b = Buffers::new();
        assert_eq!(b.current(), None);
        let a = b.create_root("a");
        let c = b.create_root("c");
        assert_eq!(b.current(), Some(a));
        b.set_current(c).unwrap();
        assert_eq!(b.current(), Some(c));
    }

    #[test]
    fn names_are_made_unique() {
        let mut b = Buffers::new();
        let one = b.create_root("scratch");
        let two = b.create_root("scratch");
        let three = b.create_root("scratch");
        assert_eq!(b.name(one).unwrap(), "scratch");
        assert_eq!(b.name(two).unwrap(), "scratch<2>");
        assert_eq!(b.name(three).unwrap(), "scratch<3>");
        assert_eq!(b.get_buffer("scratch<2>"), Some(two));
    }

    #[test]
    fn indirect_of_indirect_is_rejected() {
        let mut b = Buffers::new();
        let root = b.create_root("base");
        let ind = b.create_indirect(root, "ind").unwrap();
        assert!(matches!(
            b.create_indirect(ind, "nested"),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(b.root_of(ind).unwrap(), Some(root));
        assert_eq!(b.root_of(root).unwrap(), None);
    }

    #[test]
    fn killed_ids_are_not_found_and_never_reused() {
        let mut b = Buffers::new();
        let root = b.create_root("base");
        b.kill(root).unwrap();
        assert!(matches!(
            b.create_indirect(root, "x"),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(b.point(root), Err(Error::NotFound(root)));
        let again = b.create_root("base");
        assert_ne!(again, root);
    }

    #[test]
    fn ids_from_killed_roots_stay_answerable() {
        let mut b = Buffers::new();
        let root = b.create_root("base");
        b.insert(root, "text").unwrap();
        let m = b.make_marker();
        b.set_marker(m, Some((root, 1))).unwrap();
        let o = b.make_overlay(root, 0, 2).unwrap();
        b.kill(root).unwrap();

        assert_eq!(b.marker_position(m), Ok(None));
        assert_eq!(b.marker_buffer(m), Ok(None));
        assert_eq!(b.overlay_buffer(o), Ok(None));
        assert_eq!(b.overlay_properties(o), Ok(Vec::new()));
        assert_eq!(b.copy_marker(m, false).and_then(|c| b.marker_position(c)), Ok(None));
    }

    #[test]
    fn killing_root_kills_indirect_views_and_moves_current() {
        let mut b = Buffers::new();
        let root = b.create_root("base");
        let other = b.create_root("other");
        let ind = b.create_indirect(root, "ind").unwrap();
        b.kill(root).unwrap();
        assert!(!b.is_live(ind));
        assert_eq!(b.buffer_list(), vec![other]);
        assert_eq!(b.current(), Some(other));
    }

    #[test]
    fn narrowing_validates_and_clamps_point() {
        let mut b = Buffers::new();
        let v = b.create_root("v");
        b.insert(v, "0123456789").unwrap();
        assert_eq!(b.point(v).unwrap(), 10);
        b.narrow(v, 7, 2).unwrap();
        assert_eq!((b.point_min(v).unwrap(), b.point_max(v).unwrap()), (2, 7));
        assert_eq!(b.point(v).unwrap(), 7);
        assert_eq!(b.text(v).unwrap(), "23456");
        assert_eq!(b.goto_char(v, 0).unwrap(), 2);
        assert!(b.bobp(v).unwrap());
        assert!(matches!(b.narrow(v, 0, 11), Err(Error::InvalidArgument(_))));
        assert_eq!(b.buffer_size(v).unwrap(), 10);
        b.widen(v).unwrap();
        assert!(!b.is_narrowed(v).unwrap());
    }

    #[test]
    fn with_current_restores_on_error() {
        let mut b = Buffers::new();
        let a = b.create_root("a");
        let other = b.create_root("other");
        let result: Result<()> = b.with_current(other, |b| {
            assert_eq!(b.current(), Some(other));
            Err(Error::InvalidArgument("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(b.current(), Some(a));
    }

    #[test]
    fn with_current_keeps_new_view_when_previous_was_killed() {
        let mut b = Buffers::new();
        let a = b.create_root("a");
        let other = b.create_root("other");
        b.with_current(other, |b| b.kill(a)).unwrap();
        assert_eq!(b.current(), Some(other));
    }

    #[test]
    fn line_predicates() {
        let mut b = Buffers::new();
        let v = b.create_root("v");
        b.insert(v, "ab\ncd").unwrap();
        b.goto_char(v, 2).unwrap();
        assert!(b.eolp(v).unwrap());
        assert!(!b.bolp(v).unwrap());
        b.goto_char(v, 3).unwrap();
        assert!(b.bolp(v).unwrap());
        assert_eq!(b.char_after(v, 3).unwrap(), Some('c'));
        assert_eq!(b.char_after(v, 5).unwrap(), None);
    }
}
