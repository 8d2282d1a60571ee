//! Overlays: range-anchored property bags over a root's text.
//!
//! An [`OverlaySet`] indexes the live overlays of one root (shared by every
//! indirect view of that root). Ranges shift with edits the same way markers
//! do: `front_advance` / `rear_advance` decide whether text inserted exactly at
//! `start` / `end` lands outside or inside the overlay. The set is a plain
//! ordered map with linear range queries; overlay counts per buffer are small
//! and queries return ids in ascending order, so results are duplicate-free by
//! construction.

use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::value::{PropertyList, Value};

/// Property consulted when several overlays supply the same property.
pub const PRIORITY: &str = "priority";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub(crate) u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub start: usize,
    pub end: usize,
    pub front_advance: bool,
    pub rear_advance: bool,
    pub properties: PropertyList,
}

impl Overlay {
    /// New overlay over `[start, end)`; the bounds are swapped if inverted.
    pub fn new(start: usize, end: usize) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            start,
            end,
            front_advance: false,
            rear_advance: false,
            properties: PropertyList::new(),
        }
    }

    pub fn with_advance(mut self, front_advance: bool, rear_advance: bool) -> Self {
        self.front_advance = front_advance;
        self.rear_advance = rear_advance;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn priority(&self) -> i64 {
        self.properties
            .get(PRIORITY)
            .and_then(Value::as_int)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OverlaySet {
    overlays: BTreeMap<OverlayId, Overlay>,
}

impl OverlaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: OverlayId, overlay: Overlay) {
        self.overlays.insert(id, overlay);
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(&id)
    }

    pub fn get_mut(&mut self, id: OverlayId) -> Option<&mut Overlay> {
        self.overlays.get_mut(&id)
    }

    pub fn contains(&self, id: OverlayId) -> bool {
        self.overlays.contains_key(&id)
    }

    /// Remove `id` from the index. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: OverlayId) -> Option<Overlay> {
        self.overlays.remove(&id)
    }

    /// Empty the index, handing back every overlay it held.
    pub fn drain(&mut self) -> Vec<(OverlayId, Overlay)> {
        std::mem::take(&mut self.overlays).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = OverlayId> + '_ {
        self.overlays.keys().copied()
    }

    /// Overlays overlapping `[begin, end)`.
    ///
    /// A non-empty overlay matches when it shares at least one character with
    /// the region (or strictly contains `begin` for an empty region). An empty
    /// overlay matches when it sits at `begin`, strictly inside the region, or
    /// at `end` when `end` is `text_end` (the end of the accessible text).
    pub fn overlays_in(&self, begin: usize, end: usize, text_end: usize) -> Vec<OverlayId> {
        let (begin, end) = if begin <= end { (begin, end) } else { (end, begin) };
        let end_is_text_end = end == text_end;
        self.overlays
            .iter()
            .filter(|(_, o)| {
                (begin < o.end && o.start < end)
                    || (o.is_empty() && (begin == o.end || (end_is_text_end && o.end == end)))
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Overlays containing the character after `pos`.
    pub fn overlays_at(&self, pos: usize) -> Vec<OverlayId> {
        self.overlays
            .iter()
            .filter(|(_, o)| o.start <= pos && pos < o.end)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Value of `prop` at `pos` from the highest-priority overlay that has
    /// it. On equal priority the most recently created overlay wins.
    pub fn char_property(&self, pos: usize, prop: &str) -> Option<&Value> {
        self.overlays
            .iter()
            .filter(|(_, o)| o.start <= pos && pos < o.end)
            .filter_map(|(id, o)| o.properties.get(prop).map(|v| (o.priority(), *id, v)))
            .max_by_key(|(priority, id, _)| (*priority, *id))
            .map(|(_, _, v)| v)
    }

    pub fn adjust_for_insert(&mut self, pos: usize, len: usize) {
        for (id, o) in self.overlays.iter_mut() {
            if o.start > pos || (o.start == pos && o.front_advance) {
                o.start += len;
            }
            if o.end > pos || (o.end == pos && o.rear_advance) {
                o.end += len;
            }
            if o.start > o.end {
                trace!(target: "state.overlay", overlay = %id, start = o.start, end = o.end, "overlay_start_clamped_to_end");
                o.start = o.end;
            }
        }
    }

    pub fn adjust_for_delete(&mut self, from: usize, to: usize) {
        let len = to - from;
        let shift = |p: usize| {
            if p > to {
                p - len
            } else if p > from {
                from
            } else {
                p
            }
        };
        for o in self.overlays.values_mut() {
            o.start = shift(o.start);
            o.end = shift(o.end);
        }
    }
}
