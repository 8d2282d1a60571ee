//! User markers.

use super::{Buffers, UserMarker};
use crate::error::{Error, Result};
use crate::marker::{Marker, MarkerId, MarkerKind};
use crate::view::ViewId;

impl Buffers {
    /// New marker pointing nowhere.
    pub fn make_marker(&mut self) -> MarkerId {
        let id = MarkerId(self.next_marker);
        self.next_marker += 1;
        self.user_markers.insert(
            id,
            UserMarker {
                home: None,
                advances: false,
            },
        );
        id
    }

    /// Point `marker` at `pos` in `view` (clamped to the text), or detach it
    /// with `None`.
    pub fn set_marker(&mut self, marker: MarkerId, target: Option<(ViewId, usize)>) -> Result<()> {
        let current = *self.user_marker(marker)?;
        let placement = match target {
            Some((view, pos)) => {
                let root = self.root_id(view)?;
                Some((view, root, pos.min(self.shared(root)?.len())))
            }
            None => None,
        };
        if let Some((_, old_root)) = current.home {
            self.shared_mut(old_root)?.markers.remove(marker);
        }
        let home = match placement {
            Some((view, root, position)) => {
                self.shared_mut(root)?.markers.insert(
                    marker,
                    Marker {
                        position,
                        advances: current.advances,
                        kind: MarkerKind::User,
                    },
                );
                Some((view, root))
            }
            None => None,
        };
        if let Some(entry) = self.user_markers.get_mut(&marker) {
            entry.home = home;
        }
        Ok(())
    }

    /// New marker at the same view and position as `source`, or pointing
    /// nowhere if `source` does. The insertion type is `advances`, not the
    /// source's.
    pub fn copy_marker(&mut self, source: MarkerId, advances: bool) -> Result<MarkerId> {
        let target = match self.user_marker(source)?.home {
            Some((view, root)) => self
                .shared(root)?
                .markers
                .position(source)
                .map(|pos| (view, pos)),
            None => None,
        };
        let copy = self.make_marker();
        self.set_marker_insertion_type(copy, advances)?;
        self.set_marker(copy, target)?;
        Ok(copy)
    }

    pub fn marker_position(&self, marker: MarkerId) -> Result<Option<usize>> {
        match self.user_marker(marker)?.home {
            Some((_, root)) => Ok(self.shared(root)?.markers.position(marker)),
            None => Ok(None),
        }
    }

    /// View the marker was set in.
    pub fn marker_buffer(&self, marker: MarkerId) -> Result<Option<ViewId>> {
        Ok(self.user_marker(marker)?.home.map(|(view, _)| view))
    }

    /// `true` when insertion at the marker's position moves it forward.
    pub fn marker_insertion_type(&self, marker: MarkerId) -> Result<bool> {
        Ok(self.user_marker(marker)?.advances)
    }

    pub fn set_marker_insertion_type(&mut self, marker: MarkerId, advances: bool) -> Result<()> {
        let home = self.user_marker(marker)?.home;
        if let Some((_, root)) = home {
            self.shared_mut(root)?.markers.set_advances(marker, advances);
        }
        if let Some(entry) = self.user_markers.get_mut(&marker) {
            entry.advances = advances;
        }
        Ok(())
    }

    /// True if some user marker sits at `pos` (clamped to the accessible
    /// range) in `view`'s text.
    pub fn has_markers_at(&self, view: ViewId, pos: usize) -> Result<bool> {
        let (_, begv, zv) = self.positions(view)?;
        Ok(self
            .shared(view)?
            .markers
            .has_user_marker_at(pos.clamp(begv, zv)))
    }

    fn user_marker(&self, marker: MarkerId) -> Result<&UserMarker> {
        self.user_markers
            .get(&marker)
            .ok_or_else(|| Error::WrongType(format!("markerp, {marker}")))
    }
}
