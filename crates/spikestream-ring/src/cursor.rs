//! Cursor bookkeeping for the circular buffer.
//!
//! All modular index arithmetic lives here. Callers ask for high-level
//! moves (commit a write, consume, move the peek cursor) and never compute
//! `index % capacity` themselves.
//!
//! # Invariants
//! - `start`, `end`, `peek` are physical indices in `[0, capacity)`.
//! - `size <= capacity` and `end == (start + size) mod capacity`.
//! - `offset <= size` and `peek == (start + offset) mod capacity`.
//!
//! `size` is stored explicitly: `start == end` means both "empty" and "full".

/// Result of committing a write to the cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Physical index where the retained input starts.
    pub index: usize,
    /// Number of trailing input elements that are stored.
    pub kept: usize,
    /// Elements dropped from the logical stream: overwritten data plus any
    /// leading input that never fit.
    pub lost: usize,
    /// The peek cursor sat in the overwritten region and was moved to `start`.
    pub peek_overrun: bool,
}

/// Start/end/peek cursors over a ring of fixed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    capacity: usize,
    start: usize,
    end: usize,
    peek: usize,
    offset: usize,
    size: usize,
}

impl CursorState {
    /// Create empty cursors for a ring of `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "capacity must be positive");
        Self {
            capacity,
            start: 0,
            end: 0,
            peek: 0,
            offset: 0,
            size: 0,
        }
    }

    /// Move every cursor back to the origin.
    pub fn reset(&mut self) {
        *self = Self::new(self.capacity);
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Physical index of the oldest retained element.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Physical index where the next write lands.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Physical index of the peek cursor.
    #[inline]
    pub fn peek(&self) -> usize {
        self.peek
    }

    /// Distance from `start` to the peek cursor.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of committed (written, unconsumed) elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.size == self.capacity
    }

    /// Slots that can be written without overwriting.
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity - self.size
    }

    /// Committed elements not yet passed by the peek cursor.
    #[inline]
    pub fn ahead_of_peek(&self) -> usize {
        self.size - self.offset
    }

    /// Physical index `n` slots after `index`.
    #[inline]
    pub fn advance(&self, index: usize, n: usize) -> usize {
        debug_assert!(index < self.capacity);
        let n = n % self.capacity;
        if index >= self.capacity - n {
            index - (self.capacity - n)
        } else {
            index + n
        }
    }

    /// Forward distance from physical `from` to physical `to`, in `[0, capacity)`.
    #[inline]
    pub fn distance(&self, from: usize, to: usize) -> usize {
        debug_assert!(from < self.capacity && to < self.capacity);
        if to >= from {
            to - from
        } else {
            self.capacity - from + to
        }
    }

    /// Apply a write of `len` elements.
    ///
    /// Only the last `capacity` input elements can be stored; the caller
    /// copies `input[len - kept..]` to `index`. Oldest data is overwritten
    /// as needed and the peek cursor is dragged forward if its data was lost.
    pub fn commit_write(&mut self, len: usize) -> WriteOutcome {
        let kept = len.min(self.capacity);
        let lost = (self.size + len).saturating_sub(self.capacity);
        let evicted = (self.size + kept).saturating_sub(self.capacity);
        let index = self.end;

        self.end = self.advance(self.end, kept);
        self.start = self.advance(self.start, evicted);
        self.size = (self.size + kept).min(self.capacity);

        let peek_overrun = self.offset < lost;
        self.offset = self.offset.saturating_sub(lost).min(self.size);
        self.peek = self.advance(self.start, self.offset);

        self.check_invariants();
        WriteOutcome {
            index,
            kept,
            lost,
            peek_overrun,
        }
    }

    /// Advance `start` by up to `n` elements. Returns the number freed.
    pub fn consume(&mut self, n: usize) -> usize {
        let freed = n.min(self.size);
        self.start = self.advance(self.start, freed);
        self.size -= freed;

        if self.offset >= freed {
            self.offset -= freed;
        } else {
            // Peek sat inside the consumed region: collapse onto start
            self.offset = 0;
            self.peek = self.start;
        }

        self.check_invariants();
        freed
    }

    /// Move the peek cursor forward by `n` elements.
    pub fn advance_peek(&mut self, n: usize) {
        debug_assert!(n <= self.ahead_of_peek());
        let n = n.min(self.ahead_of_peek());
        self.offset += n;
        self.peek = self.advance(self.peek, n);
        self.check_invariants();
    }

    /// Move the peek cursor back to `start`.
    pub fn rewind(&mut self) {
        self.offset = 0;
        self.peek = self.start;
    }

    /// Place the peek cursor `offset` elements after `start` (clamped to size).
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset.min(self.size);
        self.peek = self.advance(self.start, self.offset);
        self.check_invariants();
    }

    #[inline]
    fn check_invariants(&self) {
        debug_assert!(self.size <= self.capacity);
        debug_assert!(self.offset <= self.size);
        debug_assert!(self.start < self.capacity && self.end < self.capacity);
        debug_assert_eq!(self.end, self.advance(self.start, self.size));
        debug_assert_eq!(self.peek, self.advance(self.start, self.offset));
    }
}
