//! # Memory Management
//!
//! Pre-allocated storage for per-connection and per-server bookkeeping.
//!
//! ## Design Philosophy
//!
//! Buffers are allocated once when their owner is created. After that:
//! - No growth, no shrinking
//! - Overwrite-oldest instead of reallocation
//! - Slot addressing by modular index

mod ring;

pub use ring::RingBuffer;
