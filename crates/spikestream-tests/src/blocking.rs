//! Integration tests for blocking reads and their cancellation.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use spikestream_core::BufferConfig;
use spikestream_ring::CircularBuffer;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PATIENCE: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_millis(50);

fn blocking_buffer(capacity: usize, min_size: usize) -> Arc<CircularBuffer<i32>> {
    CircularBuffer::shared(BufferConfig::with_capacity(capacity).min_size(Some(min_size))).unwrap()
}

/// Spawn a reader that peeks once and reports what it got.
fn spawn_peek(buffer: &Arc<CircularBuffer<i32>>, len: usize) -> Receiver<Vec<i32>> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let buffer = Arc::clone(buffer);
    thread::spawn(move || {
        let mut out = vec![0; len];
        let count = buffer.peek(&mut out);
        out.truncate(count);
        let _ = tx.send(out);
    });
    rx
}

fn assert_still_blocked(rx: &Receiver<Vec<i32>>) {
    assert_eq!(rx.recv_timeout(SETTLE), Err(RecvTimeoutError::Timeout));
}

#[test]
fn reader_wakes_once_threshold_is_met() {
    let buffer = blocking_buffer(16, 4);
    let rx = spawn_peek(&buffer, 8);
    assert_still_blocked(&rx);

    buffer.write(&[1, 2]);
    assert_still_blocked(&rx);

    buffer.write(&[3, 4, 5]);
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn disabling_threshold_releases_blocked_reader() {
    let buffer = blocking_buffer(16, 4);
    let rx = spawn_peek(&buffer, 8);
    assert_still_blocked(&rx);

    buffer.set_min_size(None);
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), Vec::<i32>::new());
}

#[test]
fn disabling_threshold_returns_partial_data() {
    let buffer = blocking_buffer(16, 10);
    buffer.write(&[7, 8]);
    let rx = spawn_peek(&buffer, 8);
    assert_still_blocked(&rx);

    buffer.set_min_size(None);
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), vec![7, 8]);
}

#[test]
fn mark_releases_blocked_reader() {
    let buffer = blocking_buffer(16, 10);
    buffer.write(&[1, 2, 3]);
    let rx = spawn_peek(&buffer, 8);
    assert_still_blocked(&rx);

    buffer.mark().unwrap();
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), vec![1, 2, 3]);
    assert!(buffer.is_marked());
}

#[test]
fn clear_wakes_reader_which_keeps_waiting() {
    let buffer = blocking_buffer(16, 4);
    buffer.write(&[1]);
    let rx = spawn_peek(&buffer, 8);
    assert_still_blocked(&rx);

    buffer.clear();
    assert_still_blocked(&rx);

    buffer.write(&[9, 9, 9, 9]);
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), vec![9, 9, 9, 9]);
}

#[test]
fn threshold_above_capacity_is_clamped() {
    let buffer = blocking_buffer(4, 100);
    buffer.write(&[1, 2, 3, 4]);
    let mut out = [0; 8];
    assert_eq!(buffer.peek(&mut out), 4);
}

#[test]
fn blocking_read_consumes() {
    let buffer = blocking_buffer(16, 3);
    let reader = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut out = [0; 3];
            let count = buffer.read(&mut out);
            (count, out)
        })
    };
    thread::sleep(SETTLE);
    buffer.write(&[4, 5, 6, 7]);

    let (count, out) = reader.join().unwrap();
    assert_eq!(count, 3);
    assert_eq!(out, [4, 5, 6]);
    assert_eq!(buffer.len(), 1);
}

#[test]
fn producer_waits_for_space() {
    let buffer = CircularBuffer::<i32>::shared(BufferConfig::with_capacity(4)).unwrap();
    buffer.write(&[1, 2, 3, 4]);

    let (tx, rx) = crossbeam_channel::bounded(1);
    {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            let _ = tx.send(buffer.wait_for_space(3));
        });
    }
    assert_eq!(rx.recv_timeout(SETTLE), Err(RecvTimeoutError::Timeout));

    buffer.consume(3);
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), 3);
}

#[test]
fn shrinking_capacity_releases_waiting_producer() {
    let buffer = CircularBuffer::<i32>::shared(BufferConfig::with_capacity(16)).unwrap();
    buffer.write(&(0..16).collect::<Vec<_>>());

    let (tx, rx) = crossbeam_channel::bounded(1);
    {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            let _ = tx.send(buffer.wait_for_space(10));
        });
    }
    assert_eq!(rx.recv_timeout(SETTLE), Err(RecvTimeoutError::Timeout));

    // The new ring can never hold 10 free slots; the request clamps to 4
    buffer.set_capacity(4).unwrap();
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), 4);
}
