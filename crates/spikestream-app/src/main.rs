//! SpikeStream - capture/playback demo
//!
//! Wires a simulated capture thread, an observer-driven renderer and a
//! blocking playback consumer around one shared circular buffer.
//!
//! Usage: `spikestream [config.json] [packets]`

mod capture;
mod playback;
mod render;

use anyhow::{Context, Result};
use capture::CaptureConfig;
use render::Renderer;
use spikestream_core::{defaults, BufferConfig};
use spikestream_ring::{ChangeKind, SampleBuffer};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Amplitude above which the playback consumer counts a spike.
const SPIKE_THRESHOLD: i16 = 8_000;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("SpikeStream starting...");

    let mut config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => BufferConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BufferConfig::default(),
    };
    // Playback blocks per packet; shutdown releases it with `set_min_size(None)`
    if config.min_size.is_none() {
        config = config.min_size(Some(defaults::PACKET_SAMPLES));
    }
    let packets = match std::env::args().nth(2) {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("Invalid packet count: {arg}"))?,
        None => CaptureConfig::default().packets,
    };

    let buffer = SampleBuffer::shared(config)?;
    info!(
        capacity = config.capacity,
        min_size = ?config.min_size,
        "Buffer ready"
    );

    let renderer = Arc::new(Renderer::new(Arc::downgrade(&buffer), 1024));
    let observer = Arc::clone(&renderer);
    buffer.set_observer(Some(Arc::new(move |kind: ChangeKind| {
        observer.redraw(kind)
    })))?;

    let stop = Arc::new(AtomicBool::new(false));
    let playback = {
        let buffer = Arc::clone(&buffer);
        let stop = Arc::clone(&stop);
        thread::Builder::new()
            .name("playback".into())
            .spawn(move || playback::run(&buffer, &stop, SPIKE_THRESHOLD))?
    };
    let capture = {
        let buffer = Arc::clone(&buffer);
        let config = CaptureConfig {
            packets,
            ..Default::default()
        };
        thread::Builder::new()
            .name("capture".into())
            .spawn(move || capture::run(&buffer, &config))?
    };

    let captured = capture
        .join()
        .map_err(|_| anyhow::anyhow!("Capture thread panicked"))?;

    // Release the playback reader so it drains what is left and exits
    stop.store(true, Ordering::Release);
    buffer.set_min_size(None);
    let played = playback
        .join()
        .map_err(|_| anyhow::anyhow!("Playback thread panicked"))?;

    buffer.set_observer(None)?;
    let rendered = renderer.stats();

    info!(
        packets = captured.packets,
        samples = captured.samples,
        rejected_marks = captured.rejected_marks,
        "Capture finished"
    );
    info!(
        chunks = played.chunks,
        samples = played.samples,
        spikes = played.spikes,
        overwritten = buffer.overwritten(),
        "Playback finished"
    );
    info!(
        frames = rendered.frames,
        peak = rendered.peak,
        last_min = rendered.last.min,
        last_max = rendered.last.max,
        "Rendering finished"
    );

    Ok(())
}
