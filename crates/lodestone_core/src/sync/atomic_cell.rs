//! # Atomic Float Cells
//!
//! Floats stored as their bit patterns inside integer atomics.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// An `f32` that can be shared between threads.
///
/// Every store replaces the whole bit pattern at once, so readers observe
/// either the old or the new value.
#[derive(Debug, Default)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    /// Creates a cell holding `value`.
    #[must_use]
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    /// Reads the current value.
    #[inline]
    #[must_use]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Publishes a new value.
    #[inline]
    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }
}

/// An `f64` that can be shared between threads.
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    /// Creates a cell holding `value`.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    /// Reads the current value.
    #[inline]
    #[must_use]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Publishes a new value.
    #[inline]
    pub fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_store_load() {
        let cell = AtomicF32::new(20.0);
        assert_eq!(cell.load(), 20.0);

        cell.store(19.5);
        assert_eq!(cell.load(), 19.5);

        let wide = AtomicF64::new(0.25);
        wide.store(-3.5);
        assert_eq!(wide.load(), -3.5);
    }

    #[test]
    fn test_default_is_zero() {
        assert_eq!(AtomicF32::default().load(), 0.0);
        assert_eq!(AtomicF64::default().load(), 0.0);
    }

    #[test]
    fn test_concurrent_readers_see_whole_values() {
        let cell = Arc::new(AtomicF32::new(1.0));
        let writer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                for i in 0..10_000 {
                    cell.store(if i % 2 == 0 { 1.0 } else { 2.0 });
                }
            })
        };

        for _ in 0..10_000 {
            let v = cell.load();
            assert!(v == 1.0 || v == 2.0, "torn value {v}");
        }
        writer.join().unwrap();
    }
}
