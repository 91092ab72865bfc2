//! Observer-driven render consumer.
//!
//! Redraws are triggered by buffer change notifications instead of
//! polling. Each frame summarizes the newest window of samples.

use parking_lot::Mutex;
use spikestream_core::Sample;
use spikestream_ring::{ChangeKind, SampleBuffer};
use std::sync::Weak;
use tracing::trace;

/// One rendered frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct Frame {
    pub samples: usize,
    pub min: Sample,
    pub max: Sample,
}

/// Accumulated render statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderStats {
    pub frames: usize,
    pub last: Frame,
    pub peak: Sample,
}

/// Renders the newest `window` samples whenever the buffer changes.
pub struct Renderer {
    buffer: Weak<SampleBuffer>,
    window: Mutex<Vec<Sample>>,
    stats: Mutex<RenderStats>,
}

impl Renderer {
    pub fn new(buffer: Weak<SampleBuffer>, window: usize) -> Self {
        Self {
            buffer,
            window: Mutex::new(vec![0; window]),
            stats: Mutex::new(RenderStats::default()),
        }
    }

    pub fn stats(&self) -> RenderStats {
        *self.stats.lock()
    }

    /// Draw one frame from the current buffer contents.
    pub fn redraw(&self, kind: ChangeKind) {
        let Some(buffer) = self.buffer.upgrade() else {
            return;
        };
        let mut window = self.window.lock();
        let count = buffer.latest(&mut window);
        let visible = &window[..count];

        let frame = Frame {
            samples: count,
            min: visible.iter().copied().min().unwrap_or(0),
            max: visible.iter().copied().max().unwrap_or(0),
        };
        trace!(?kind, samples = frame.samples, "Frame rendered");

        let mut stats = self.stats.lock();
        stats.frames += 1;
        stats.peak = stats.peak.max(frame.max);
        stats.last = frame;
    }
}
