//! SpikeStream Core - Foundation types for signal buffering
//!
//! This crate provides the types shared by every SpikeStream crate:
//! - Error type and `Result` alias
//! - Buffer configuration (`BufferConfig`)
//! - Sample type and acquisition defaults

pub mod config;
pub mod error;

pub use config::BufferConfig;
pub use error::{Result, SpikeStreamError};

/// A single captured signal sample (signed 16-bit PCM).
pub type Sample = i16;

/// Acquisition defaults used when no configuration is supplied.
pub mod defaults {
    /// Capture rate of the acquisition hardware, in samples per second.
    pub const SAMPLE_RATE: u32 = 10_000;

    /// Default ring capacity: one second of history at `SAMPLE_RATE`.
    pub const BUFFER_CAPACITY: usize = SAMPLE_RATE as usize;

    /// Samples per capture packet. Producers mark a boundary after each.
    pub const PACKET_SAMPLES: usize = 500;

    /// Upper bound on outstanding marks per buffer.
    pub const MAX_MARKS: usize = 1024;
}
