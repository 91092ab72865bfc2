//! Integration tests for asynchronous change notification.

use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;
use spikestream_core::BufferConfig;
use spikestream_ring::{ChangeKind, CircularBuffer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PATIENCE: Duration = Duration::from_secs(5);

fn shared(capacity: usize) -> Arc<CircularBuffer<i16>> {
    CircularBuffer::shared(BufferConfig::with_capacity(capacity)).unwrap()
}

#[test]
fn observer_can_read_buffer_from_callback() {
    let buffer = shared(16);
    let weak = Arc::downgrade(&buffer);
    let (tx, rx) = crossbeam_channel::unbounded();
    buffer
        .set_observer(Some(Arc::new(move |_kind: ChangeKind| {
            if let Some(buffer) = weak.upgrade() {
                let _ = tx.send(buffer.len());
            }
        })))
        .unwrap();

    buffer.write(&[1, 2, 3]);
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), 3);
}

#[test]
fn slow_observer_never_blocks_writer() {
    let buffer = shared(64);
    let calls = Arc::new(AtomicUsize::new(0));
    let (release_tx, release_rx) = crossbeam_channel::unbounded::<()>();
    {
        let calls = Arc::clone(&calls);
        buffer
            .set_observer(Some(Arc::new(move |_kind: ChangeKind| {
                calls.fetch_add(1, Ordering::SeqCst);
                let _ = release_rx.recv();
            })))
            .unwrap();
    }

    for i in 0..10_000 {
        buffer.write(&[i as i16]);
    }
    assert_eq!(buffer.len(), 64);

    // Let the stuck callback and at most one coalesced follow-up finish
    release_tx.send(()).unwrap();
    release_tx.send(()).unwrap();
    buffer.set_observer(None).unwrap();
    assert!(calls.load(Ordering::SeqCst) <= 2);
}

#[test]
fn every_mutation_kind_is_reported() {
    let buffer = shared(8);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = crossbeam_channel::unbounded();
    {
        let seen = Arc::clone(&seen);
        buffer
            .set_observer(Some(Arc::new(move |kind: ChangeKind| {
                seen.lock().push(kind);
                let _ = tx.send(());
            })))
            .unwrap();
    }

    let expect = |kind: ChangeKind| {
        rx.recv_timeout(PATIENCE).unwrap();
        assert_eq!(seen.lock().last().copied(), Some(kind));
    };

    buffer.write(&[1, 2]);
    expect(ChangeKind::Write);
    buffer.mark().unwrap();
    expect(ChangeKind::Mark);
    buffer.consume(1);
    expect(ChangeKind::Consume);
    buffer.clear();
    expect(ChangeKind::Clear);
    buffer.set_capacity(4).unwrap();
    expect(ChangeKind::Resize);
}

#[test]
fn read_through_mark_reports_consume() {
    let buffer = shared(8);
    buffer.write(&[1, 2]);
    buffer.mark().unwrap();
    buffer.write(&[3]);

    let (tx, rx) = crossbeam_channel::unbounded();
    buffer
        .set_observer(Some(Arc::new(move |kind: ChangeKind| {
            let _ = tx.send(kind);
        })))
        .unwrap();

    let mut out = [0i16; 4];
    assert_eq!(buffer.try_read(&mut out), 2);
    assert_eq!(buffer.mark_count(), 0);
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), ChangeKind::Consume);

    // Acknowledging a mark on its own still reports a mark change
    buffer.mark().unwrap();
    assert!(buffer.unmark());
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), ChangeKind::Mark);
}

#[test]
fn unchanged_state_is_not_reported() {
    let buffer = shared(8);
    let (tx, rx) = crossbeam_channel::unbounded();
    buffer
        .set_observer(Some(Arc::new(move |kind: ChangeKind| {
            let _ = tx.send(kind);
        })))
        .unwrap();

    buffer.write(&[]);
    buffer.consume(5);
    assert!(!buffer.unmark());
    let mut out = [0i16; 4];
    buffer.try_peek(&mut out);
    assert_eq!(
        rx.recv_timeout(Duration::from_millis(50)),
        Err(RecvTimeoutError::Timeout)
    );
}

#[test]
fn removed_observer_is_not_called() {
    let buffer = shared(8);
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        buffer
            .set_observer(Some(Arc::new(move |_kind: ChangeKind| {
                calls.fetch_add(1, Ordering::SeqCst);
            })))
            .unwrap();
    }
    buffer.set_observer(None).unwrap();

    buffer.write(&[1, 2, 3]);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn dropping_buffer_stops_dispatcher() {
    let buffer = shared(8);
    let weak = Arc::downgrade(&buffer);
    buffer
        .set_observer(Some(Arc::new(|_kind: ChangeKind| {})))
        .unwrap();
    buffer.write(&[1]);
    drop(buffer);
    assert!(weak.upgrade().is_none());
}
