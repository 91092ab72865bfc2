//! SpikeStream Ring - Circular buffer between capture and consumers
//!
//! Decouples a real-time producer (the capture thread) from consumers
//! (render loop, playback/analysis) that read the same rolling window of
//! history at their own pace.
//!
//! Architecture:
//! - `RingStore`: fixed-capacity backing array with wrap-around copies
//! - `CursorState`: start/end/peek bookkeeping, the only place doing index math
//! - `MarkQueue`: FIFO of chunk boundaries with full/empty disambiguation
//! - `Notifier`: per-buffer asynchronous change dispatcher
//! - `CircularBuffer`: composes the above behind one fair lock

pub mod buffer;
pub mod cursor;
pub mod marks;
pub mod notify;
pub mod store;

pub use buffer::{CircularBuffer, Transaction};
pub use cursor::{CursorState, WriteOutcome};
pub use marks::{AtStart, Mark, MarkPosition, MarkQueue};
pub use notify::{ChangeKind, ChangeObserver, Notifier};
pub use store::RingStore;

/// Circular buffer of raw signal samples.
pub type SampleBuffer = CircularBuffer<spikestream_core::Sample>;
