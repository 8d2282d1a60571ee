//! Overlay operations on the registry.
//!
//! Overlays are indexed per root and shared by its indirect views. Every id
//! ever handed out stays known: deleting an overlay moves it out of its
//! root's index into a detached state where its properties remain readable
//! and writable, and `move_overlay` can attach it again.

use tracing::trace;

use super::{Buffers, OverlayHome};
use crate::error::{Error, Result};
use crate::overlay::{Overlay, OverlayId};
use crate::value::{Symbol, Value};
use crate::view::ViewId;

impl Buffers {
    /// New overlay over `[start, end)` of `view`'s text. Bounds are clamped
    /// to the text and ordered.
    pub fn make_overlay(&mut self, view: ViewId, start: usize, end: usize) -> Result<OverlayId> {
        self.make_overlay_with(view, start, end, false, false)
    }

    pub fn make_overlay_with(
        &mut self,
        view: ViewId,
        start: usize,
        end: usize,
        front_advance: bool,
        rear_advance: bool,
    ) -> Result<OverlayId> {
        let root = self.root_id(view)?;
        let len = self.shared(root)?.len();
        let id = OverlayId(self.next_overlay);
        self.next_overlay += 1;
        let overlay =
            Overlay::new(start.min(len), end.min(len)).with_advance(front_advance, rear_advance);
        trace!(target: "state.overlay", overlay = %id, start = overlay.start, end = overlay.end, "overlay_created");
        self.shared_mut(root)?.overlays.insert(id, overlay);
        self.overlay_homes.insert(id, OverlayHome::Attached(root));
        Ok(id)
    }

    /// Set `key` on `overlay`; returns the previous value.
    pub fn overlay_put(
        &mut self,
        overlay: OverlayId,
        key: impl Into<Symbol>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        Ok(self.overlay_mut(overlay)?.properties.put(key, value))
    }

    pub fn overlay_get(&self, overlay: OverlayId, key: &str) -> Result<Option<&Value>> {
        Ok(self.overlay(overlay)?.properties.get(key))
    }

    pub fn overlay_remove(&mut self, overlay: OverlayId, key: &str) -> Result<Option<Value>> {
        Ok(self.overlay_mut(overlay)?.properties.remove(key))
    }

    /// Properties in first-insertion order. `WrongType` for an id that never
    /// named an overlay.
    pub fn overlay_properties(&self, overlay: OverlayId) -> Result<Vec<(Symbol, Value)>> {
        Ok(self.overlay(overlay)?.properties.to_vec())
    }

    /// Remove `overlay` from its root's index. Deleting an already deleted
    /// overlay does nothing.
    pub fn delete_overlay(&mut self, overlay: OverlayId) -> Result<()> {
        let root = match self.overlay_homes.get(&overlay) {
            None => return Err(wrong_type(overlay)),
            Some(OverlayHome::Detached(_)) => return Ok(()),
            Some(OverlayHome::Attached(root)) => *root,
        };
        let detached = self
            .shared_mut(root)?
            .overlays
            .remove(overlay)
            .ok_or(Error::NotFound(root))?;
        self.overlay_homes
            .insert(overlay, OverlayHome::Detached(detached));
        trace!(target: "state.overlay", overlay = %overlay, "overlay_deleted");
        Ok(())
    }

    /// Delete every overlay of `view`'s root.
    pub fn delete_all_overlays(&mut self, view: ViewId) -> Result<()> {
        let drained = self.shared_mut(view)?.overlays.drain();
        let count = drained.len();
        for (id, overlay) in drained {
            self.overlay_homes.insert(id, OverlayHome::Detached(overlay));
        }
        trace!(target: "state.overlay", view = %view, count, "overlays_cleared");
        Ok(())
    }

    /// Overlays overlapping `[begin, end)`, ascending by id. Empty overlays
    /// count when they sit at `begin`, strictly inside the region, or at
    /// `end` when `end` is the end of `view`'s accessible text.
    pub fn overlays_in(&self, view: ViewId, begin: usize, end: usize) -> Result<Vec<OverlayId>> {
        let text_end = self.point_max(view)?;
        Ok(self.shared(view)?.overlays.overlays_in(begin, end, text_end))
    }

    /// Overlays covering the character after `pos`.
    pub fn overlays_at(&self, view: ViewId, pos: usize) -> Result<Vec<OverlayId>> {
        Ok(self.shared(view)?.overlays.overlays_at(pos))
    }

    /// Every overlay attached to `view`'s text, ascending by id.
    pub fn overlay_lists(&self, view: ViewId) -> Result<Vec<OverlayId>> {
        Ok(self.shared(view)?.overlays.ids().collect())
    }

    /// `None` once the overlay has been deleted.
    pub fn overlay_start(&self, overlay: OverlayId) -> Result<Option<usize>> {
        Ok(self.attached(overlay)?.map(|o| o.start))
    }

    pub fn overlay_end(&self, overlay: OverlayId) -> Result<Option<usize>> {
        Ok(self.attached(overlay)?.map(|o| o.end))
    }

    /// Root whose text the overlay is attached to.
    pub fn overlay_buffer(&self, overlay: OverlayId) -> Result<Option<ViewId>> {
        match self.overlay_homes.get(&overlay) {
            None => Err(wrong_type(overlay)),
            Some(OverlayHome::Attached(root)) => Ok(Some(*root)),
            Some(OverlayHome::Detached(_)) => Ok(None),
        }
    }

    /// Move `overlay` to `[start, end)` of `view`'s text, reattaching it if
    /// it was deleted.
    pub fn move_overlay(
        &mut self,
        overlay: OverlayId,
        view: ViewId,
        start: usize,
        end: usize,
    ) -> Result<()> {
        let target = self.root_id(view)?;
        let mut moving = match self.overlay_homes.remove(&overlay) {
            None => return Err(wrong_type(overlay)),
            Some(OverlayHome::Detached(o)) => o,
            Some(OverlayHome::Attached(root)) => {
                let Some(o) = self
                    .shared_mut(root)
                    .ok()
                    .and_then(|shared| shared.overlays.remove(overlay))
                else {
                    self.overlay_homes
                        .insert(overlay, OverlayHome::Attached(root));
                    return Err(Error::NotFound(root));
                };
                o
            }
        };
        let shared = self.shared_mut(target)?;
        let len = shared.len();
        let (start, end) = (start.min(len), end.min(len));
        (moving.start, moving.end) = if start <= end { (start, end) } else { (end, start) };
        shared.overlays.insert(overlay, moving);
        self.overlay_homes
            .insert(overlay, OverlayHome::Attached(target));
        Ok(())
    }

    /// Value of `prop` at `pos` from the overlays covering it. Among several
    /// the highest `priority` wins, then the most recently created.
    pub fn char_property(&self, view: ViewId, pos: usize, prop: &str) -> Result<Option<&Value>> {
        Ok(self.shared(view)?.overlays.char_property(pos, prop))
    }

    fn overlay(&self, overlay: OverlayId) -> Result<&Overlay> {
        match self.overlay_homes.get(&overlay) {
            None => Err(wrong_type(overlay)),
            Some(OverlayHome::Detached(o)) => Ok(o),
            Some(OverlayHome::Attached(root)) => self
                .shared(*root)?
                .overlays
                .get(overlay)
                .ok_or(Error::NotFound(*root)),
        }
    }

    fn overlay_mut(&mut self, overlay: OverlayId) -> Result<&mut Overlay> {
        let root = match self.overlay_homes.get(&overlay) {
            None => return Err(wrong_type(overlay)),
            Some(OverlayHome::Detached(_)) => None,
            Some(OverlayHome::Attached(root)) => Some(*root),
        };
        match root {
            Some(root) => self
                .shared_mut(root)?
                .overlays
                .get_mut(overlay)
                .ok_or(Error::NotFound(root)),
            None => match self.overlay_homes.get_mut(&overlay) {
                Some(OverlayHome::Detached(o)) => Ok(o),
                _ => Err(wrong_type(overlay)),
            },
        }
    }

    fn attached(&self, overlay: OverlayId) -> Result<Option<&Overlay>> {
        match self.overlay_homes.get(&overlay) {
            None => Err(wrong_type(overlay)),
            Some(OverlayHome::Detached(_)) => Ok(None),
            Some(OverlayHome::Attached(_)) => self.overlay(overlay).map(Some),
        }
    }
}

fn wrong_type(overlay: OverlayId) -> Error {
    Error::WrongType(format!("overlayp, {overlay}"))
}
