//! Playback/analysis consumer.
//!
//! Reads the stream one packet at a time: peeks until the packet boundary
//! mark is reached, then releases the packet and acknowledges the mark.

use spikestream_core::Sample;
use spikestream_ring::SampleBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::trace;

/// Back-off between polls while the buffer has no blocking threshold.
const IDLE_POLL: Duration = Duration::from_millis(1);

/// Totals reported by the playback loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaybackStats {
    pub chunks: usize,
    pub samples: usize,
    pub spikes: usize,
}

/// Run the playback loop until `stop` is set and the buffer is drained.
///
/// Blocking reads are released by disabling the buffer's threshold after
/// setting `stop`. Without a threshold the loop polls, sleeping between
/// empty peeks.
pub fn run(buffer: &SampleBuffer, stop: &AtomicBool, spike_threshold: Sample) -> PlaybackStats {
    let mut scratch = vec![0 as Sample; 256];
    let mut stats = PlaybackStats::default();
    let mut chunk_len = 0usize;

    loop {
        let count = buffer.peek(&mut scratch);
        chunk_len += count;
        stats.spikes += scratch[..count]
            .iter()
            .filter(|&&s| s >= spike_threshold)
            .count();

        if buffer.is_marked() {
            buffer.transaction(|tx| {
                tx.flush();
                tx.unmark();
                tx.clear_marked();
            });
            trace!(chunk_len, "Packet played");
            stats.chunks += 1;
            stats.samples += chunk_len;
            chunk_len = 0;
            continue;
        }

        if count == 0 {
            if stop.load(Ordering::Acquire) {
                break;
            }
            if buffer.min_size().is_none() {
                thread::sleep(IDLE_POLL);
            }
        }
    }

    // Trailing partial packet
    buffer.flush();
    stats.samples += chunk_len;
    stats
}
