//! # Cross-Thread Publication
//!
//! Metrics are written by the scheduler thread and read from arbitrary
//! command/query threads.
//!
//! ```text
//! Scheduler thread:  store(20.0)  ──┐
//!                                   ▼
//!                          ┌─────────────────┐
//!                          │ AtomicU32 bits  │
//!                          └─────────────────┘
//!                                   │
//! Query thread:      load() ◄───────┘   (never half-written)
//! ```
//!
//! One atomic cell per published value. No locks.

mod atomic_cell;

pub use atomic_cell::{AtomicF32, AtomicF64};
