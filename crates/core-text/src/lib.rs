//! Rope-based text storage shared by a root buffer and its indirect views.
//!
//! All positions are character offsets counted from 0. The store itself has
//! no notion of narrowing, point or undo; those live in `core-state`, which
//! validates coordinates before it calls in here. Every mutator clamps its
//! arguments to the current length so a stale coordinate can never panic.

use std::fmt;
use std::ops::Range;

use ropey::Rope;

/// Character content for one root buffer, backed by a `ropey::Rope`.
#[derive(Clone, Default)]
pub struct TextStore {
    rope: Rope,
}

impl TextStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of characters held.
    pub fn len(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Character at `pos`, `None` at or past the end.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        if pos < self.rope.len_chars() {
            Some(self.rope.char(pos))
        } else {
            None
        }
    }

    /// True when `pos` starts a line (position 0 or just after a newline).
    pub fn is_line_start(&self, pos: usize) -> bool {
        let pos = self.clamp(pos);
        pos == 0 || self.rope.char(pos - 1) == '\n'
    }

    /// True when `pos` ends a line (end of text or just before a newline).
    pub fn is_line_end(&self, pos: usize) -> bool {
        matches!(self.char_at(pos), None | Some('\n'))
    }

    /// Copy of the characters in `range` (clamped, empty when inverted).
    pub fn slice(&self, range: Range<usize>) -> String {
        let (start, end) = self.clamp_range(range);
        if start == end {
            return String::new();
        }
        self.rope.slice(start..end).to_string()
    }

    /// Insert `text` at `pos` (clamped to the end). Returns the number of
    /// characters inserted.
    pub fn insert(&mut self, pos: usize, text: &str) -> usize {
        let pos = self.clamp(pos);
        let before = self.rope.len_chars();
        self.rope.insert(pos, text);
        self.rope.len_chars() - before
    }

    /// Remove the characters in `range` (clamped) and return them.
    pub fn remove(&mut self, range: Range<usize>) -> String {
        let (start, end) = self.clamp_range(range);
        if start == end {
            return String::new();
        }
        let removed = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);
        removed
    }

    fn clamp(&self, pos: usize) -> usize {
        pos.min(self.rope.len_chars())
    }

    fn clamp_range(&self, range: Range<usize>) -> (usize, usize) {
        let start = self.clamp(range.start);
        let end = self.clamp(range.end);
        if start > end { (start, start) } else { (start, end) }
    }
}

impl fmt::Display for TextStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.rope.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TextStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextStore")
            .field("chars", &self.len())
            .field("lines", &self.rope.len_lines())
            .finish()
    }
}
