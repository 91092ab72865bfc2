//! Bookmarks delimiting logical chunks in the sample stream.
//!
//! A mark records a physical index. When that index equals `start` the
//! index alone is ambiguous: the mark may sit before zero elements (it was
//! taken on an empty buffer, or everything before it has been consumed or
//! overwritten) or before a whole ring of them (it was taken on a full
//! buffer). `AtStart` carries that bit, and `MarkPosition` resolves a mark
//! against the current cursors into one of three explicit states.

use crate::cursor::CursorState;
use spikestream_core::{Result, SpikeStreamError};
use std::collections::VecDeque;

/// Meaning of a mark whose index coincides with `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtStart {
    /// Nothing lies before the mark.
    Empty,
    /// A full ring of elements lies before the mark.
    Full,
}

/// A mark resolved against the current cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPosition {
    /// The mark lies this many elements after `start` (`0 < n < capacity`).
    Ahead(usize),
    /// The mark coincides with `start` and no elements precede it.
    AtStartEmpty,
    /// The mark coincides with `start` and `capacity` elements precede it.
    AtStartFull,
}

/// A recorded chunk boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    index: usize,
    at_start: AtStart,
}

impl Mark {
    /// Build the mark lying `distance` elements after `start`.
    pub fn at(cursors: &CursorState, distance: usize) -> Self {
        debug_assert!(distance <= cursors.capacity());
        Self {
            index: cursors.advance(cursors.start(), distance),
            at_start: if distance == cursors.capacity() {
                AtStart::Full
            } else {
                AtStart::Empty
            },
        }
    }

    /// Physical index of the mark.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Resolve the mark against the cursors.
    pub fn position(&self, cursors: &CursorState) -> MarkPosition {
        if self.index != cursors.start() {
            return MarkPosition::Ahead(cursors.distance(cursors.start(), self.index));
        }
        match self.at_start {
            AtStart::Empty => MarkPosition::AtStartEmpty,
            AtStart::Full => MarkPosition::AtStartFull,
        }
    }

    /// Number of committed elements before the mark.
    pub fn distance(&self, cursors: &CursorState) -> usize {
        match self.position(cursors) {
            MarkPosition::Ahead(n) => n,
            MarkPosition::AtStartEmpty => 0,
            MarkPosition::AtStartFull => cursors.capacity(),
        }
    }
}

/// FIFO queue of marks, ordered by position in the stream.
#[derive(Debug, Clone)]
pub struct MarkQueue {
    marks: VecDeque<Mark>,
    limit: usize,
}

impl MarkQueue {
    /// Create an empty queue holding at most `limit` marks.
    pub fn new(limit: usize) -> Self {
        Self {
            marks: VecDeque::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    /// Append a mark at the current end of committed data.
    ///
    /// Returns `Ok(false)` when the newest mark already marks the same
    /// position with the same meaning.
    pub fn push_at_end(&mut self, cursors: &CursorState) -> Result<bool> {
        let distance = cursors.len();
        if self
            .marks
            .back()
            .is_some_and(|last| last.distance(cursors) == distance)
        {
            return Ok(false);
        }
        if self.marks.len() >= self.limit {
            return Err(SpikeStreamError::MarkLimit { limit: self.limit });
        }
        self.marks.push_back(Mark::at(cursors, distance));
        Ok(true)
    }

    /// Remove the oldest mark.
    pub fn pop_front(&mut self) -> Option<Mark> {
        self.marks.pop_front()
    }

    /// Elements before the oldest mark.
    pub fn oldest_distance(&self, cursors: &CursorState) -> Option<usize> {
        self.marks.front().map(|mark| mark.distance(cursors))
    }

    /// Distance of the first mark at or ahead of the peek cursor.
    pub fn next_barrier(&self, cursors: &CursorState) -> Option<usize> {
        self.marks
            .iter()
            .map(|mark| mark.distance(cursors))
            .find(|&distance| distance >= cursors.offset())
    }

    /// Re-anchor marks after `start` moved forward by `passed` stream
    /// elements, from `before` to `after`.
    ///
    /// Marks strictly behind the new start are dropped. A mark landing
    /// exactly on it survives with nothing before it.
    pub fn rebase(&mut self, before: &CursorState, after: &CursorState, passed: usize) {
        self.marks.retain_mut(|mark| {
            let distance = mark.distance(before);
            if distance < passed {
                return false;
            }
            *mark = Mark::at(after, distance - passed);
            true
        });
    }
}
