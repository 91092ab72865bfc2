//! Simulated acquisition front-end.
//!
//! Produces a noisy baseline with periodic spikes, one packet at a time,
//! and marks a boundary after every packet.

use spikestream_core::{defaults, Sample, SpikeStreamError};
use spikestream_ring::SampleBuffer;
use std::time::Duration;
use tracing::{debug, warn};

/// Capture loop settings.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Number of packets to produce before stopping.
    pub packets: usize,
    /// Samples per packet.
    pub packet_samples: usize,
    /// Pause between packets.
    pub interval: Duration,
    /// A spike is emitted every this many samples.
    pub spike_period: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            packets: 200,
            packet_samples: defaults::PACKET_SAMPLES,
            interval: Duration::from_millis(2),
            spike_period: 1250,
        }
    }
}

/// Totals reported by the capture loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct CaptureStats {
    pub packets: usize,
    pub samples: usize,
    pub rejected_marks: usize,
}

/// Deterministic signal generator.
struct SignalGenerator {
    position: usize,
    noise: u32,
    spike_period: usize,
}

impl SignalGenerator {
    fn new(spike_period: usize) -> Self {
        Self {
            position: 0,
            noise: 0x2545_f491,
            spike_period: spike_period.max(1),
        }
    }

    fn fill(&mut self, packet: &mut [Sample]) {
        for sample in packet.iter_mut() {
            // xorshift noise, roughly +/- 256
            self.noise ^= self.noise << 13;
            self.noise ^= self.noise >> 17;
            self.noise ^= self.noise << 5;
            let noise = (self.noise % 512) as i32 - 256;

            let phase = self.position % self.spike_period;
            let spike = match phase {
                0 => 12_000,
                1 => -6_000,
                2 => 2_000,
                _ => 0,
            };
            *sample = (noise + spike).clamp(Sample::MIN as i32, Sample::MAX as i32) as Sample;
            self.position += 1;
        }
    }
}

/// Run the capture loop on the current thread.
pub fn run(buffer: &SampleBuffer, config: &CaptureConfig) -> CaptureStats {
    let mut generator = SignalGenerator::new(config.spike_period);
    let mut packet = vec![0 as Sample; config.packet_samples];
    let mut stats = CaptureStats::default();

    for _ in 0..config.packets {
        generator.fill(&mut packet);
        let lost = buffer.write(&packet);
        if lost > 0 {
            debug!(lost, "Consumers fell behind, oldest samples overwritten");
        }
        match buffer.mark() {
            Ok(_) => {}
            Err(SpikeStreamError::MarkLimit { .. }) => stats.rejected_marks += 1,
            Err(err) => warn!("Failed to mark packet boundary: {err}"),
        }

        stats.packets += 1;
        stats.samples += packet.len();
        std::thread::sleep(config.interval);
    }
    stats
}
