//! Per-root undo log: boundary-grouped change records with size-bounded
//! truncation.
//!
//! Storage:
//! - Records live in an arena of slots linked newest → oldest. `head` names
//!   the newest record; every slot only knows its older neighbour, so there
//!   are no back references to keep in sync.
//! - Appending pushes a new head. Truncation severs the chain by clearing one
//!   `next` link, which is the only structural change it ever makes; the
//!   detached tail is then returned to the free list.
//! - A disabled log is the `None` sentinel: every append is ignored until the
//!   log is re-enabled, which starts from an empty chain.
//!
//! Grouping:
//! - A *group* is the run of records between two `Boundary` records (or
//!   between the head / tail and the nearest boundary). Callers insert
//!   boundaries at command granularity via [`UndoLog::boundary`].
//!
//! Truncation (see [`UndoLog::truncate`]) walks from the head accumulating the
//! storage cost of each record. The most recent group is always kept. Older
//! groups are kept while the total stays within `soft_limit`; the group that
//! crosses `soft_limit` is kept as long as the total before it stays within
//! `strong_limit`. All comparisons are strict `>`.
//!
//! Undo replay keeps a *pending* cursor so consecutive `undo` calls walk
//! further back instead of undoing the previous undo. Any change recorded
//! outside a replay resets it.

use std::fmt;

use core_config::UndoConfig;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::marker::MarkerAdjustment;
use crate::value::{Symbol, Value};

/// Cost of the link cell every record occupies.
pub const LINK_COST: usize = 16;
/// Cost of a record's payload cell.
pub const PAYLOAD_COST: usize = 16;
/// Fixed cost of a saved text, on top of one unit per character.
pub const TEXT_HEADER_COST: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoEntry {
    /// `length` characters were inserted at `pos`.
    Insert { pos: usize, length: usize },
    /// `text` was deleted from `pos`.
    Delete {
        pos: usize,
        text: String,
        adjust_markers: Vec<MarkerAdjustment>,
    },
    /// `property` over `[begin, end)` had `old_value` before the change.
    PropertyChange {
        begin: usize,
        end: usize,
        property: Symbol,
        old_value: Value,
    },
    Boundary,
}

impl UndoEntry {
    pub fn is_boundary(&self) -> bool {
        matches!(self, UndoEntry::Boundary)
    }

    /// Storage units charged to this record by truncation.
    pub fn storage_cost(&self) -> usize {
        match self {
            UndoEntry::Boundary => LINK_COST,
            UndoEntry::Insert { .. } | UndoEntry::PropertyChange { .. } => {
                LINK_COST + PAYLOAD_COST
            }
            UndoEntry::Delete {
                text,
                adjust_markers,
                ..
            } => {
                LINK_COST
                    + PAYLOAD_COST
                    + TEXT_HEADER_COST
                    + text.chars().count()
                    + adjust_markers.len() * (LINK_COST + PAYLOAD_COST)
            }
        }
    }
}

/// Callback run when the most recent group alone exceeds `outer_limit`. It
/// receives the log being truncated and the group's size and returns `true`
/// when it has dealt with the situation itself.
pub type OuterLimitHandler = Box<dyn FnMut(&mut UndoLog, usize) -> bool>;

/// Truncation thresholds.
pub struct UndoLimits {
    soft_limit: usize,
    strong_limit: usize,
    outer_limit: Option<usize>,
    handler: Option<OuterLimitHandler>,
}

impl UndoLimits {
    /// `strong_limit` must exceed `soft_limit`. `outer_limit = None` means no
    /// outer limit.
    pub fn new(soft_limit: usize, strong_limit: usize, outer_limit: Option<usize>) -> Result<Self> {
        if strong_limit <= soft_limit {
            return Err(Error::InvalidArgument(format!(
                "undo strong limit {strong_limit} must exceed soft limit {soft_limit}"
            )));
        }
        Ok(Self {
            soft_limit,
            strong_limit,
            outer_limit,
            handler: None,
        })
    }

    pub fn from_config(cfg: &UndoConfig) -> Result<Self> {
        Self::new(cfg.limit, cfg.strong_limit, cfg.outer_limit.bytes())
    }

    pub fn soft_limit(&self) -> usize {
        self.soft_limit
    }
    pub fn strong_limit(&self) -> usize {
        self.strong_limit
    }
    pub fn outer_limit(&self) -> Option<usize> {
        self.outer_limit
    }

    pub fn set_outer_limit_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&mut UndoLog, usize) -> bool + 'static,
    {
        self.handler = Some(Box::new(handler));
    }

    pub fn clear_outer_limit_handler(&mut self) {
        self.handler = None;
    }

    pub fn has_outer_limit_handler(&self) -> bool {
        self.handler.is_some()
    }
}

impl Default for UndoLimits {
    fn default() -> Self {
        Self {
            soft_limit: core_config::DEFAULT_UNDO_LIMIT,
            strong_limit: core_config::DEFAULT_UNDO_STRONG_LIMIT,
            outer_limit: Some(core_config::DEFAULT_UNDO_OUTER_LIMIT),
            handler: None,
        }
    }
}

impl fmt::Debug for UndoLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoLimits")
            .field("soft_limit", &self.soft_limit)
            .field("strong_limit", &self.strong_limit)
            .field("outer_limit", &self.outer_limit)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// What a call to [`UndoLog::truncate`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    /// The log fit within the limits (or is disabled) and was left alone.
    Unchanged,
    /// The outer-limit handler reported the situation handled.
    Handled { size: usize },
    /// The log was severed; `discarded` older records were dropped.
    Severed { kept: usize, discarded: usize },
}

#[derive(Debug)]
struct Slot {
    entry: UndoEntry,
    next: Option<usize>,
}

#[derive(Debug, Default)]
struct Chain {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<usize>,
    len: usize,
}

impl Chain {
    fn push(&mut self, entry: UndoEntry) -> usize {
        let slot = Slot {
            entry,
            next: self.head,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.head = Some(idx);
        self.len += 1;
        idx
    }

    fn slot(&self, idx: usize) -> &Slot {
        self.slots[idx]
            .as_ref()
            .unwrap_or_else(|| unreachable!("undo slot {idx} is linked but free"))
    }

    fn entry(&self, idx: usize) -> &UndoEntry {
        &self.slot(idx).entry
    }

    fn next_of(&self, idx: usize) -> Option<usize> {
        self.slot(idx).next
    }

    fn head_entry(&self) -> Option<&UndoEntry> {
        self.head.map(|idx| self.entry(idx))
    }

    fn release(&mut self, idx: usize) -> Option<Slot> {
        let slot = self.slots[idx].take()?;
        self.free.push(idx);
        self.len -= 1;
        Some(slot)
    }

    fn pop_head(&mut self) -> Option<(usize, UndoEntry)> {
        let idx = self.head?;
        let slot = self.release(idx)?;
        self.head = slot.next;
        Some((idx, slot.entry))
    }

    /// Detach everything older than `idx`. Returns the released slot indices.
    fn sever_after(&mut self, idx: usize) -> Vec<usize> {
        let mut next = match self.slots[idx].as_mut() {
            Some(slot) => slot.next.take(),
            None => None,
        };
        let mut released = Vec::new();
        while let Some(i) = next {
            next = self.release(i).and_then(|slot| slot.next);
            released.push(i);
        }
        released
    }

    fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            chain: self,
            next: self.head,
        }
    }
}

struct ChainIter<'a> {
    chain: &'a Chain,
    next: Option<usize>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a UndoEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let slot = self.chain.slot(idx);
        self.next = slot.next;
        Some(&slot.entry)
    }
}

/// Where the next consecutive `undo` resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pending {
    /// No undo in progress: start from the head.
    Idle,
    At(usize),
    /// Walked off the end of the log.
    Exhausted,
}

#[derive(Debug)]
pub struct UndoLog {
    chain: Option<Chain>,
    /// Held while the outer-limit handler runs.
    suspended: bool,
    replaying: bool,
    pending: Pending,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoLog {
    /// Enabled, empty log.
    pub fn new() -> Self {
        Self {
            chain: Some(Chain::default()),
            suspended: false,
            replaying: false,
            pending: Pending::Idle,
        }
    }

    /// Log in the disabled state.
    pub fn disabled() -> Self {
        Self {
            chain: None,
            ..Self::new()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.chain.is_some()
    }

    pub fn disable(&mut self) {
        self.chain = None;
        self.pending = Pending::Idle;
        trace!(target: "state.undo", "undo_disabled");
    }

    /// Re-enable a disabled log with an empty history. No-op when enabled.
    pub fn enable(&mut self) {
        if self.chain.is_none() {
            self.chain = Some(Chain::default());
            self.pending = Pending::Idle;
            trace!(target: "state.undo", "undo_enabled");
        }
    }

    /// Drop every record, keeping the enabled/disabled state.
    pub fn clear(&mut self) {
        if let Some(chain) = self.chain.as_mut() {
            *chain = Chain::default();
        }
        self.pending = Pending::Idle;
    }

    /// True while recording is possible (enabled and not suspended).
    pub fn accepts_records(&self) -> bool {
        self.chain.is_some() && !self.suspended
    }

    /// Append `entry` as the new head. Returns `false` when the log is
    /// disabled or suspended and the record was dropped.
    pub fn record(&mut self, entry: UndoEntry) -> bool {
        if self.suspended {
            trace!(target: "state.undo", "record_rejected_while_suspended");
            return false;
        }
        let Some(chain) = self.chain.as_mut() else {
            return false;
        };
        chain.push(entry);
        if !self.replaying {
            self.pending = Pending::Idle;
        }
        true
    }

    /// Record an insertion, merging it into an adjacent `Insert` at the head.
    pub fn record_insert(&mut self, pos: usize, length: usize) -> bool {
        if !self.accepts_records() {
            return false;
        }
        let merged = match self.chain.as_ref().and_then(Chain::head_entry) {
            Some(UndoEntry::Insert {
                pos: prev,
                length: prev_len,
            }) if prev + prev_len == pos => Some((*prev, prev_len + length)),
            _ => None,
        };
        if let Some((start, total)) = merged
            && let Some(chain) = self.chain.as_mut()
            && let Some((idx, _)) = chain.pop_head()
        {
            if self.pending == Pending::At(idx) {
                self.pending = Pending::Exhausted;
            }
            trace!(target: "state.undo", pos = start, length = total, "insert_amalgamated");
            return self.record(UndoEntry::Insert {
                pos: start,
                length: total,
            });
        }
        self.record(UndoEntry::Insert { pos, length })
    }

    /// Close the current group. Does nothing on an empty, disabled or
    /// suspended log or when the head already is a boundary.
    pub fn boundary(&mut self) {
        if self.suspended {
            trace!(target: "state.undo", "boundary_rejected_while_suspended");
            return;
        }
        let Some(chain) = self.chain.as_mut() else {
            return;
        };
        match chain.head_entry() {
            None | Some(UndoEntry::Boundary) => {}
            Some(_) => {
                chain.push(UndoEntry::Boundary);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.chain.as_ref().map_or(0, |c| c.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &UndoEntry> {
        self.chain.as_ref().into_iter().flat_map(Chain::iter)
    }

    /// Total storage cost of every record.
    pub fn size(&self) -> usize {
        self.iter().map(UndoEntry::storage_cost).sum()
    }

    /// Number of groups (runs of non-boundary records).
    pub fn group_count(&self) -> usize {
        let mut groups = 0;
        let mut in_group = false;
        for entry in self.iter() {
            if entry.is_boundary() {
                in_group = false;
            } else if !in_group {
                in_group = true;
                groups += 1;
            }
        }
        groups
    }

    /// Shrink the log to fit `limits`, discarding the oldest groups.
    ///
    /// Returns `Err(Error::Reentrant)` when called from inside the
    /// outer-limit handler of a truncation already running on this log.
    pub fn truncate(&mut self, limits: &mut UndoLimits) -> Result<Truncation> {
        if self.suspended {
            debug!(target: "state.undo", "truncate_rejected_reentrant");
            return Err(Error::Reentrant);
        }
        let Some((size, _, _)) = self.scan_newest_group() else {
            return Ok(Truncation::Unchanged);
        };

        if let Some(outer) = limits.outer_limit
            && size > outer
            && let Some(handler) = limits.handler.as_mut()
        {
            debug!(target: "state.undo", size, outer_limit = outer, "outer_limit_exceeded");
            self.suspended = true;
            let handled = handler(self, size);
            self.suspended = false;
            if handled {
                return Ok(Truncation::Handled { size });
            }
        }

        // The handler may have edited the log even when declining; scan again.
        let Some((size, prev, next)) = self.scan_newest_group() else {
            return Ok(Truncation::Unchanged);
        };
        self.scan_rest(limits, size, prev, next)
    }

    /// Cost of the leading boundary plus the most recent group, the last slot
    /// of that group and the slot after it.
    fn scan_newest_group(&self) -> Option<(usize, Option<usize>, Option<usize>)> {
        let chain = self.chain.as_ref()?;
        let mut size = 0usize;
        let mut prev = None;
        let mut next = chain.head;
        if let Some(idx) = next
            && chain.entry(idx).is_boundary()
        {
            size += chain.entry(idx).storage_cost();
            prev = Some(idx);
            next = chain.next_of(idx);
        }
        while let Some(idx) = next {
            let entry = chain.entry(idx);
            if entry.is_boundary() {
                break;
            }
            size += entry.storage_cost();
            prev = Some(idx);
            next = chain.next_of(idx);
        }
        Some((size, prev, next))
    }

    fn scan_rest(
        &mut self,
        limits: &UndoLimits,
        mut size: usize,
        mut prev: Option<usize>,
        mut next: Option<usize>,
    ) -> Result<Truncation> {
        let Some(chain) = self.chain.as_ref() else {
            return Ok(Truncation::Unchanged);
        };

        // Fallback: keep only the most recent group.
        let mut cut = next.and(prev);
        let mut stopped = false;

        while let Some(idx) = next {
            let entry = chain.entry(idx);
            if entry.is_boundary() {
                if size > limits.strong_limit {
                    stopped = true;
                    break;
                }
                cut = prev;
                if size > limits.soft_limit {
                    stopped = true;
                    break;
                }
            }
            size += entry.storage_cost();
            prev = Some(idx);
            next = chain.next_of(idx);
        }

        if !stopped {
            trace!(target: "state.undo", size, "truncate_within_limits");
            return Ok(Truncation::Unchanged);
        }
        let Some(cut) = cut else {
            return Ok(Truncation::Unchanged);
        };

        let Some(chain) = self.chain.as_mut() else {
            return Ok(Truncation::Unchanged);
        };
        let released = chain.sever_after(cut);
        if let Pending::At(p) = self.pending
            && released.contains(&p)
        {
            self.pending = Pending::Exhausted;
        }
        let kept = self.len();
        debug!(
            target: "state.undo",
            kept,
            discarded = released.len(),
            soft_limit = limits.soft_limit,
            strong_limit = limits.strong_limit,
            "undo_log_truncated"
        );
        Ok(Truncation::Severed {
            kept,
            discarded: released.len(),
        })
    }

    pub(crate) fn pending(&self) -> Pending {
        self.pending
    }

    /// Put the undo cursor back after a replay that failed.
    pub(crate) fn rewind_pending(&mut self, pending: Pending) {
        self.pending = pending;
    }

    pub(crate) fn begin_replay(&mut self) {
        self.replaying = true;
    }

    pub(crate) fn end_replay(&mut self) {
        self.replaying = false;
    }

    pub(crate) fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Take the next group to undo, advancing the pending cursor past it.
    pub(crate) fn next_undo_group(&mut self) -> Result<Vec<UndoEntry>> {
        let Some(chain) = self.chain.as_ref() else {
            return Err(Error::Disabled);
        };
        let mut cursor = match self.pending {
            Pending::Idle => chain.head,
            Pending::At(idx) => Some(idx),
            Pending::Exhausted => None,
        };
        while let Some(idx) = cursor
            && chain.entry(idx).is_boundary()
        {
            cursor = chain.next_of(idx);
        }
        let mut group = Vec::new();
        let mut resume = Pending::Exhausted;
        while let Some(idx) = cursor {
            let entry = chain.entry(idx);
            if entry.is_boundary() {
                resume = chain.next_of(idx).map_or(Pending::Exhausted, Pending::At);
                break;
            }
            group.push(entry.clone());
            cursor = chain.next_of(idx);
        }
        self.pending = resume;
        if group.is_empty() {
            return Err(Error::NoFurtherUndo);
        }
        trace!(target: "state.undo", records = group.len(), "undo_group_taken");
        Ok(group)
    }
}
