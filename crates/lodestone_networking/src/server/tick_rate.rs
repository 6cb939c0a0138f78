//! # Tick-Rate Monitor
//!
//! Measures how many scheduler ticks actually happen per second.
//!
//! ```text
//! scheduler thread                       query threads
//! ┌────────────────────┐   AtomicF32    ┌──────────────────┐
//! │ TickRateMonitor    │ ─────────────► │ TickRateMetrics  │
//! │  samples (ring)    │   short        │  short_rate()    │
//! │  last sample time  │   rolling      │  rolling_rate()  │
//! └────────────────────┘                └──────────────────┘
//! ```
//!
//! Each published value is its own atomic cell; readers may see a fresh
//! short rate next to a stale rolling rate, never a torn float.

use std::sync::Arc;
use std::time::Instant;

use lodestone_core::{AtomicF32, RingBuffer};

use crate::config::TickRateConfig;
use crate::error::{TaskError, TaskResult};
use crate::server::scheduler::ScheduledTask;
use crate::TARGET_TICK_RATE;

/// Published tick rates, shared with query threads.
#[derive(Debug)]
pub struct TickRateMetrics {
    short: AtomicF32,
    rolling: AtomicF32,
}

impl TickRateMetrics {
    /// Creates metrics reporting the target rate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            short: AtomicF32::new(TARGET_TICK_RATE),
            rolling: AtomicF32::new(TARGET_TICK_RATE),
        }
    }

    /// Ticks per second over the short window.
    #[inline]
    #[must_use]
    pub fn short_rate(&self) -> f32 {
        self.short.load()
    }

    /// Ticks per second over every buffered sample.
    #[inline]
    #[must_use]
    pub fn rolling_rate(&self) -> f32 {
        self.rolling.load()
    }

    /// Two-line human readable summary.
    #[must_use]
    pub fn report(&self) -> String {
        format!(
            "TPS: {:.2}\nAverage TPS: {:.2}",
            self.short_rate(),
            self.rolling_rate()
        )
    }
}

impl Default for TickRateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Samples tick intervals and publishes rates.
#[derive(Debug)]
pub struct TickRateMonitor {
    samples: RingBuffer<f64>,
    short_window: usize,
    last: Instant,
    metrics: Arc<TickRateMetrics>,
}

impl TickRateMonitor {
    /// Creates a monitor whose first interval is measured from `now`.
    #[must_use]
    pub fn new(config: &TickRateConfig, now: Instant) -> Self {
        Self {
            samples: RingBuffer::with_capacity(config.sample_capacity.max(1)),
            short_window: config.short_window.max(1),
            last: now,
            metrics: Arc::new(TickRateMetrics::new()),
        }
    }

    /// Shared handle to the published rates.
    #[must_use]
    pub fn metrics(&self) -> Arc<TickRateMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Number of buffered samples.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Records the interval since the previous sample.
    ///
    /// # Errors
    ///
    /// [`TaskError::ClockWentBackwards`] if `now` precedes the previous
    /// sample; nothing is recorded.
    pub fn sample(&mut self, now: Instant) -> TaskResult {
        let Some(elapsed) = now.checked_duration_since(self.last) else {
            return Err(TaskError::ClockWentBackwards(self.last - now));
        };
        self.last = now;
        self.record(elapsed.as_secs_f64() * 1000.0);
        Ok(())
    }

    /// Records one interval in milliseconds and republishes.
    ///
    /// Rates are published once more samples than the short window exist.
    pub fn record(&mut self, elapsed_ms: f64) {
        self.samples.push(elapsed_ms);
        if self.samples.len() <= self.short_window {
            return;
        }

        let short = mean(self.samples.recent(self.short_window).copied(), self.short_window);
        let rolling = mean(self.samples.iter().copied(), self.samples.len());

        self.metrics.short.store(rate(short));
        self.metrics.rolling.store(rate(rolling));
    }
}

impl ScheduledTask for TickRateMonitor {
    fn name(&self) -> &'static str {
        "tick-rate"
    }

    fn run(&mut self, now: Instant) -> TaskResult {
        self.sample(now)
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    values.sum::<f64>() / count as f64
}

#[allow(clippy::cast_possible_truncation)]
fn rate(mean_ms: f64) -> f32 {
    if mean_ms <= 0.0 {
        return 0.0;
    }
    (1000.0 / mean_ms) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn monitor() -> (TickRateMonitor, Instant) {
        let now = Instant::now();
        (TickRateMonitor::new(&TickRateConfig::default(), now), now)
    }

    #[test]
    fn test_initial_rate() {
        let (m, _) = monitor();
        assert!((m.metrics().short_rate() - 20.0).abs() < f32::EPSILON);
        assert!((m.metrics().rolling_rate() - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_uniform_samples() {
        let (mut m, start) = monitor();
        let metrics = m.metrics();

        for i in 1..=21 {
            m.sample(start + Duration::from_millis(50 * i)).unwrap();
        }

        assert_eq!(m.sample_count(), 21);
        assert!((metrics.short_rate() - 20.0).abs() < 0.01);
        assert!((metrics.rolling_rate() - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_nothing_published_until_window_exceeded() {
        let (mut m, _) = monitor();
        for _ in 0..20 {
            m.record(100.0);
        }
        assert!((m.metrics().short_rate() - 20.0).abs() < f32::EPSILON);

        m.record(100.0);
        assert!((m.metrics().short_rate() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_backwards_clock_is_rejected() {
        let (mut m, start) = monitor();
        m.sample(start + Duration::from_millis(100)).unwrap();

        let result = m.sample(start + Duration::from_millis(40));
        assert_eq!(
            result,
            Err(TaskError::ClockWentBackwards(Duration::from_millis(60)))
        );
        assert_eq!(m.sample_count(), 1);
    }

    #[test]
    fn test_report() {
        let metrics = TickRateMetrics::new();
        assert_eq!(metrics.report(), "TPS: 20.00\nAverage TPS: 20.00");
    }
}
