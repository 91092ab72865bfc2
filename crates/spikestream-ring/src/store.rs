//! Fixed-capacity backing store with wrap-around copy primitives.
//!
//! The store knows nothing about which region is valid; `CursorState`
//! decides that. Copies are split into at most two segments.

/// Element-typed backing array used circularly.
pub struct RingStore<T> {
    slots: Box<[T]>,
}

impl<T: Copy + Default> RingStore<T> {
    /// Allocate a store of `capacity` default elements.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![T::default(); capacity].into_boxed_slice(),
        }
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Copy `data` into the store starting at physical `index`, wrapping.
    ///
    /// `data` must not be longer than the capacity.
    pub fn write_at(&mut self, index: usize, data: &[T]) {
        debug_assert!(index < self.capacity() || data.is_empty());
        debug_assert!(data.len() <= self.capacity());

        let first_chunk = (self.capacity() - index).min(data.len());
        let (head, tail) = data.split_at(first_chunk);
        self.slots[index..index + first_chunk].copy_from_slice(head);
        self.slots[..tail.len()].copy_from_slice(tail);
    }

    /// Copy `out.len()` elements out of the store starting at `index`, wrapping.
    pub fn read_at(&self, index: usize, out: &mut [T]) {
        debug_assert!(index < self.capacity() || out.is_empty());
        debug_assert!(out.len() <= self.capacity());

        let first_chunk = (self.capacity() - index).min(out.len());
        let (head, tail) = out.split_at_mut(first_chunk);
        head.copy_from_slice(&self.slots[index..index + first_chunk]);
        let tail_len = tail.len();
        tail.copy_from_slice(&self.slots[..tail_len]);
    }
}
