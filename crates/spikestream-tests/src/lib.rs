//! Integration test crate for SpikeStream.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the buffer from real producer and consumer threads.

#[cfg(test)]
mod blocking;


#[cfg(test)]
mod notification;
