//! Thread-safe circular buffer with peek cursor, blocking reads and marks.
//!
//! One producer (or several) appends samples with `write`; consumers read
//! the same rolling window with `peek`, then release it with
//! `consume`/`flush`. Writes never block: when the ring is full the oldest
//! samples are overwritten ("most recent wins") and a reader whose peek
//! cursor fell into the overwritten region is moved to the new start.
//!
//! Marks let a producer record chunk boundaries. Reads stop exactly at the
//! first mark at or ahead of the peek cursor and set the sticky
//! `is_marked` flag. A consuming `read` also pops the mark it stopped at;
//! after `peek` + `flush` the reader acknowledges the boundary with `unmark`.
//!
//! All state sits behind one `parking_lot::Mutex`. Every critical section
//! is released with `MutexGuard::unlock_fair`, handing the lock to the
//! longest waiter. Readers block on `data_available`; producers may wait
//! for room on `space_available`.

use crate::cursor::CursorState;
use crate::marks::MarkQueue;
use crate::notify::{ChangeKind, ChangeObserver, Notifier};
use crate::store::RingStore;
use parking_lot::{Condvar, Mutex, MutexGuard};
use spikestream_core::{BufferConfig, Result, SpikeStreamError};
use std::sync::Arc;
use tracing::{debug, trace, warn};

struct State<T> {
    store: RingStore<T>,
    cursors: CursorState,
    marks: MarkQueue,
    was_marked: bool,
    min_size: Option<usize>,
    overwritten: u64,
}

impl<T: Copy + Default> State<T> {
    fn new(config: &BufferConfig) -> Self {
        Self {
            store: RingStore::new(config.capacity),
            cursors: CursorState::new(config.capacity),
            marks: MarkQueue::new(config.max_marks),
            was_marked: false,
            min_size: config.min_size,
            overwritten: 0,
        }
    }

    /// Whether a blocking read has to wait for more data.
    fn must_wait(&self) -> bool {
        let Some(min_size) = self.min_size else {
            return false;
        };
        let threshold = min_size.min(self.cursors.capacity());
        self.cursors.ahead_of_peek() < threshold
            && self.marks.next_barrier(&self.cursors).is_none()
    }
}

/// Signals and notifications owed once the lock is released.
#[derive(Debug, Default, Clone, Copy)]
struct Pending {
    wake_readers: bool,
    wake_writers: bool,
    change: Option<ChangeKind>,
}

/// Exclusive access to a buffer for a batch of operations.
///
/// Obtained through [`CircularBuffer::transaction`]. Nothing in here
/// blocks; wake-ups and change notifications for everything done in the
/// transaction are published once the lock is released.
pub struct Transaction<'a, T> {
    state: &'a mut State<T>,
    pending: Pending,
}

impl<'a, T: Copy + Default> Transaction<'a, T> {
    fn new(state: &'a mut State<T>) -> Self {
        Self {
            state,
            pending: Pending::default(),
        }
    }

    /// Record the change to report on release. One notification covers the
    /// whole transaction; a data change outranks a mark change, so a read
    /// that both consumes and pops a mark reports `Consume`.
    fn changed(&mut self, kind: ChangeKind) {
        if kind == ChangeKind::Mark && self.pending.change.is_some() {
            return;
        }
        self.pending.change = Some(kind);
    }

    /// Append samples, overwriting the oldest ones if the ring is full.
    ///
    /// Returns how many stream elements were lost to make room. When
    /// `data` is longer than the capacity only its last `capacity`
    /// elements are kept.
    pub fn write(&mut self, data: &[T]) -> usize {
        if data.is_empty() {
            return 0;
        }
        let state = &mut *self.state;
        let before = state.cursors;
        let outcome = state.cursors.commit_write(data.len());
        state
            .store
            .write_at(outcome.index, &data[data.len() - outcome.kept..]);

        if outcome.lost > 0 {
            state.marks.rebase(&before, &state.cursors, outcome.lost);
            state.overwritten += outcome.lost as u64;
            trace!(
                lost = outcome.lost,
                peek_overrun = outcome.peek_overrun,
                "Overwrote oldest samples"
            );
        }

        self.pending.wake_readers = true;
        self.changed(ChangeKind::Write);
        outcome.lost
    }

    /// Copy from the peek cursor without consuming. Never blocks.
    ///
    /// Stops at the first mark at or ahead of the peek cursor and sets the
    /// marked flag once the cursor reaches it.
    pub fn try_peek(&mut self, out: &mut [T]) -> usize {
        self.peek_inner(out).0
    }

    fn peek_inner(&mut self, out: &mut [T]) -> (usize, bool) {
        let state = &mut *self.state;
        let barrier = state.marks.next_barrier(&state.cursors);
        let limit = match barrier {
            Some(distance) => distance - state.cursors.offset(),
            None => state.cursors.ahead_of_peek(),
        };

        let count = out.len().min(limit);
        if count > 0 {
            state
                .store
                .read_at(state.cursors.peek(), &mut out[..count]);
            state.cursors.advance_peek(count);
        }

        let at_mark = barrier == Some(state.cursors.offset());
        if at_mark {
            state.was_marked = true;
        }
        (count, at_mark)
    }

    /// Copy the newest `min(out.len(), len)` committed elements, oldest
    /// first, leaving cursors, marks and the marked flag untouched.
    pub fn latest(&self, out: &mut [T]) -> usize {
        let state = &*self.state;
        let count = out.len().min(state.cursors.len());
        let from = state
            .cursors
            .advance(state.cursors.start(), state.cursors.len() - count);
        state.store.read_at(from, &mut out[..count]);
        count
    }

    /// Peek, then consume everything up to the peek cursor. Never blocks.
    ///
    /// A mark the read stopped at is removed.
    pub fn try_read(&mut self, out: &mut [T]) -> usize {
        let (count, at_mark) = self.peek_inner(out);
        self.flush();
        if at_mark && self.state.marks.pop_front().is_some() {
            self.changed(ChangeKind::Mark);
        }
        count
    }

    /// Release up to `n` elements from the front. Returns the number freed.
    pub fn consume(&mut self, n: usize) -> usize {
        let state = &mut *self.state;
        let before = state.cursors;
        let freed = state.cursors.consume(n);
        if freed == 0 {
            return 0;
        }
        state.marks.rebase(&before, &state.cursors, freed);

        self.pending.wake_writers = true;
        self.changed(ChangeKind::Consume);
        freed
    }

    /// Consume exactly what has been peeked.
    pub fn flush(&mut self) -> usize {
        let offset = self.state.cursors.offset();
        self.consume(offset)
    }

    /// Record a chunk boundary at the end of committed data.
    ///
    /// Returns `Ok(false)` if the newest mark already records this boundary.
    pub fn mark(&mut self) -> Result<bool> {
        let state = &mut *self.state;
        let added = match state.marks.push_at_end(&state.cursors) {
            Ok(added) => added,
            Err(err) => {
                warn!(limit = state.marks.limit(), "Rejected mark: {err}");
                return Err(err);
            }
        };
        if added {
            self.pending.wake_readers = true;
            self.changed(ChangeKind::Mark);
        }
        Ok(added)
    }

    /// Drop the oldest mark. Returns whether one existed.
    pub fn unmark(&mut self) -> bool {
        let removed = self.state.marks.pop_front().is_some();
        if removed {
            self.changed(ChangeKind::Mark);
        }
        removed
    }

    /// Committed elements before the oldest mark, 0 without marks.
    pub fn marked_size(&self) -> usize {
        self.state
            .marks
            .oldest_distance(&self.state.cursors)
            .unwrap_or(0)
    }

    pub fn mark_count(&self) -> usize {
        self.state.marks.len()
    }

    /// Whether a read has stopped at a mark since the flag was last cleared.
    pub fn is_marked(&self) -> bool {
        self.state.was_marked
    }

    pub fn clear_marked(&mut self) {
        self.state.was_marked = false;
    }

    /// Move the peek cursor back to the oldest retained element.
    pub fn rewind(&mut self) {
        self.state.cursors.rewind();
    }

    /// Peek cursor position, counted from the oldest retained element.
    pub fn peek_position(&self) -> usize {
        self.state.cursors.offset()
    }

    /// Place the peek cursor `position` elements after the oldest retained
    /// element, clamped to the committed size.
    pub fn set_peek_position(&mut self, position: usize) {
        self.state.cursors.set_offset(position);
    }

    /// Committed elements ahead of the peek cursor.
    pub fn peek_available(&self) -> usize {
        self.state.cursors.ahead_of_peek()
    }

    pub fn len(&self) -> usize {
        self.state.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.cursors.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.state.cursors.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.state.cursors.capacity()
    }

    /// Total elements lost to overwrites over the buffer's lifetime.
    pub fn overwritten(&self) -> u64 {
        self.state.overwritten
    }

    pub fn min_size(&self) -> Option<usize> {
        self.state.min_size
    }

    /// Change the blocking threshold. `None` disables blocking and
    /// releases every blocked reader.
    pub fn set_min_size(&mut self, min_size: Option<usize>) {
        self.state.min_size = min_size;
        self.pending.wake_readers = true;
    }

    /// Drop all data and marks without reallocating.
    pub fn clear(&mut self) {
        let state = &mut *self.state;
        state.cursors.reset();
        state.marks.clear();
        state.was_marked = false;

        self.pending.wake_readers = true;
        self.pending.wake_writers = true;
        self.changed(ChangeKind::Clear);
    }

    /// Reallocate the backing store, discarding all data and marks.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(SpikeStreamError::InvalidCapacity(capacity));
        }
        let state = &mut *self.state;
        state.store = RingStore::new(capacity);
        state.cursors = CursorState::new(capacity);
        state.marks.clear();
        state.was_marked = false;
        debug!(capacity, "Circular buffer resized");

        self.pending.wake_readers = true;
        self.pending.wake_writers = true;
        self.changed(ChangeKind::Resize);
        Ok(())
    }
}

/// Thread-safe lossy circular buffer shared between capture and consumers.
pub struct CircularBuffer<T> {
    state: Mutex<State<T>>,
    data_available: Condvar,
    space_available: Condvar,
    notifier: Notifier,
}

impl<T: Copy + Default + Send> CircularBuffer<T> {
    /// Create a buffer with `capacity` slots and default settings.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(BufferConfig::with_capacity(capacity))
    }

    /// Create a buffer from a validated configuration.
    pub fn with_config(config: BufferConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            capacity = config.capacity,
            min_size = ?config.min_size,
            max_marks = config.max_marks,
            "Creating circular buffer"
        );
        Ok(Self {
            state: Mutex::new(State::new(&config)),
            data_available: Condvar::new(),
            space_available: Condvar::new(),
            notifier: Notifier::new(),
        })
    }

    /// Create a buffer wrapped in an `Arc` for sharing across threads.
    pub fn shared(config: BufferConfig) -> Result<Arc<Self>> {
        Self::with_config(config).map(Arc::new)
    }

    /// Run `f` with exclusive access, then release the lock fairly and
    /// publish wake-ups and notifications.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Transaction<'_, T>) -> R) -> R {
        let guard = self.state.lock();
        self.run(guard, f)
    }

    fn run<R>(
        &self,
        mut guard: MutexGuard<'_, State<T>>,
        f: impl FnOnce(&mut Transaction<'_, T>) -> R,
    ) -> R {
        let (result, pending) = {
            let mut tx = Transaction::new(&mut guard);
            let result = f(&mut tx);
            (result, tx.pending)
        };
        MutexGuard::unlock_fair(guard);
        self.publish(pending);
        result
    }

    /// Like `transaction`, but first waits until a read may proceed.
    fn blocking<R>(&self, f: impl FnOnce(&mut Transaction<'_, T>) -> R) -> R {
        let mut guard = self.state.lock();
        while guard.must_wait() {
            self.data_available.wait(&mut guard);
        }
        self.run(guard, f)
    }

    fn publish(&self, pending: Pending) {
        if pending.wake_readers {
            self.data_available.notify_all();
        }
        if pending.wake_writers {
            self.space_available.notify_all();
        }
        if let Some(kind) = pending.change {
            self.notifier.notify(kind);
        }
    }

    /// Append samples; see [`Transaction::write`]. Never blocks.
    pub fn write(&self, data: &[T]) -> usize {
        self.transaction(|tx| tx.write(data))
    }

    /// Copy from the peek cursor without consuming.
    ///
    /// With a blocking threshold set, waits until that many elements lie
    /// ahead of the peek cursor or a mark is reached. Returns the number of
    /// elements copied, which may be less than requested.
    pub fn peek(&self, out: &mut [T]) -> usize {
        self.blocking(|tx| tx.try_peek(out))
    }

    /// `peek` that never blocks.
    pub fn try_peek(&self, out: &mut [T]) -> usize {
        self.transaction(|tx| tx.try_peek(out))
    }

    /// Consuming read: peeks (blocking like `peek`), then consumes up to
    /// the peek cursor. A mark the read stopped at is removed.
    pub fn read(&self, out: &mut [T]) -> usize {
        self.blocking(|tx| tx.try_read(out))
    }

    /// Copy the newest committed elements for display; see
    /// [`Transaction::latest`].
    pub fn latest(&self, out: &mut [T]) -> usize {
        self.transaction(|tx| tx.latest(out))
    }

    /// `read` that never blocks.
    pub fn try_read(&self, out: &mut [T]) -> usize {
        self.transaction(|tx| tx.try_read(out))
    }

    /// Release up to `n` elements from the front. Returns the number freed.
    pub fn consume(&self, n: usize) -> usize {
        self.transaction(|tx| tx.consume(n))
    }

    /// Consume exactly what has been peeked.
    pub fn flush(&self) -> usize {
        self.transaction(|tx| tx.flush())
    }

    /// Block until at least `n` slots (at most the capacity) are free.
    ///
    /// Writes never need this; it is for producers that prefer waiting to
    /// overwriting. Returns the free space observed. The request is clamped
    /// against the current capacity on every wake-up, so a concurrent
    /// `set_capacity` to a smaller ring releases the waiter.
    pub fn wait_for_space(&self, n: usize) -> usize {
        let mut guard = self.state.lock();
        while guard.cursors.free() < n.min(guard.cursors.capacity()) {
            self.space_available.wait(&mut guard);
        }
        let free = guard.cursors.free();
        MutexGuard::unlock_fair(guard);
        free
    }

    pub fn mark(&self) -> Result<bool> {
        self.transaction(|tx| tx.mark())
    }

    pub fn unmark(&self) -> bool {
        self.transaction(|tx| tx.unmark())
    }

    pub fn marked_size(&self) -> usize {
        self.transaction(|tx| tx.marked_size())
    }

    pub fn mark_count(&self) -> usize {
        self.transaction(|tx| tx.mark_count())
    }

    pub fn is_marked(&self) -> bool {
        self.transaction(|tx| tx.is_marked())
    }

    pub fn clear_marked(&self) {
        self.transaction(|tx| tx.clear_marked())
    }

    pub fn rewind(&self) {
        self.transaction(|tx| tx.rewind())
    }

    pub fn peek_position(&self) -> usize {
        self.transaction(|tx| tx.peek_position())
    }

    pub fn set_peek_position(&self, position: usize) {
        self.transaction(|tx| tx.set_peek_position(position))
    }

    pub fn peek_available(&self) -> usize {
        self.transaction(|tx| tx.peek_available())
    }

    pub fn len(&self) -> usize {
        self.transaction(|tx| tx.len())
    }

    pub fn is_empty(&self) -> bool {
        self.transaction(|tx| tx.is_empty())
    }

    pub fn is_full(&self) -> bool {
        self.transaction(|tx| tx.is_full())
    }

    pub fn capacity(&self) -> usize {
        self.transaction(|tx| tx.capacity())
    }

    pub fn overwritten(&self) -> u64 {
        self.transaction(|tx| tx.overwritten())
    }

    pub fn min_size(&self) -> Option<usize> {
        self.transaction(|tx| tx.min_size())
    }

    pub fn set_min_size(&self, min_size: Option<usize>) {
        self.transaction(|tx| tx.set_min_size(min_size))
    }

    pub fn clear(&self) {
        self.transaction(|tx| tx.clear());
        debug!("Circular buffer cleared");
    }

    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        self.transaction(|tx| tx.set_capacity(capacity))
    }

    /// Register a change observer, or remove it with `None`.
    ///
    /// The observer runs on a dedicated thread; see [`crate::notify`].
    pub fn set_observer(&self, observer: Option<Arc<dyn ChangeObserver>>) -> Result<()> {
        self.notifier.set_observer(observer)
    }
}
