//! # Tick-Rate Integration Tests

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use lodestone_networking::{
    ScheduledTask, Scheduler, TaskError, TaskResult, TickRateConfig, TickRateMonitor,
};

fn assert_rate(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() <= 0.01,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_uniform_ticks_report_twenty() {
    let mut monitor = TickRateMonitor::new(&TickRateConfig::default(), Instant::now());
    for _ in 0..21 {
        monitor.record(50.0);
    }

    let metrics = monitor.metrics();
    assert_rate(metrics.short_rate(), 20.0);
    assert_rate(metrics.rolling_rate(), 20.0);
}

#[test]
fn test_slow_tick_in_short_window() {
    let mut monitor = TickRateMonitor::new(&TickRateConfig::default(), Instant::now());
    for _ in 0..20 {
        monitor.record(50.0);
    }
    monitor.record(500.0);

    let metrics = monitor.metrics();
    // 1000 / ((19 * 50 + 500) / 20)
    assert_rate(metrics.short_rate(), 1000.0 / 72.5);
    // 1000 / ((20 * 50 + 500) / 21)
    assert_rate(metrics.rolling_rate(), 14.0);
}

#[test]
fn test_slow_tick_outside_short_window() {
    let mut monitor = TickRateMonitor::new(&TickRateConfig::default(), Instant::now());
    monitor.record(500.0);
    for _ in 0..20 {
        monitor.record(50.0);
    }

    let metrics = monitor.metrics();
    assert_rate(metrics.short_rate(), 20.0);
    assert_rate(metrics.rolling_rate(), 14.0);
}

#[test]
fn test_oldest_samples_evicted() {
    let config = TickRateConfig {
        sample_capacity: 40,
        short_window: 20,
    };
    let mut monitor = TickRateMonitor::new(&config, Instant::now());
    for _ in 0..40 {
        monitor.record(500.0);
    }
    for _ in 0..40 {
        monitor.record(100.0);
    }

    assert_eq!(monitor.sample_count(), 40);
    assert_rate(monitor.metrics().rolling_rate(), 10.0);
}

#[test]
fn test_metrics_readable_from_other_threads() {
    let start = Instant::now();
    let mut monitor = TickRateMonitor::new(&TickRateConfig::default(), start);
    let metrics = monitor.metrics();

    let reader = {
        let metrics = Arc::clone(&metrics);
        thread::spawn(move || {
            for _ in 0..10_000 {
                let rate = metrics.short_rate();
                assert!(rate.is_finite() && rate > 0.0);
            }
        })
    };

    for i in 1..=2_000u64 {
        monitor.record(if i % 2 == 0 { 40.0 } else { 60.0 });
    }
    reader.join().unwrap();

    assert_rate(metrics.rolling_rate(), 20.0);
    assert!(metrics.report().starts_with("TPS: 20.00\nAverage TPS: 20.00"));
}

struct Flaky {
    calls: u32,
}

impl ScheduledTask for Flaky {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn run(&mut self, _now: Instant) -> TaskResult {
        self.calls += 1;
        if self.calls % 2 == 1 {
            return Err(TaskError::Failed(format!("call {}", self.calls)));
        }
        Ok(())
    }
}

#[test]
fn test_failing_task_does_not_stop_sampling() {
    let start = Instant::now();
    let period = Duration::from_millis(50);
    let monitor = TickRateMonitor::new(&TickRateConfig::default(), start);
    let metrics = monitor.metrics();

    let mut scheduler = Scheduler::new(period, start);
    scheduler.add_task(Flaky { calls: 0 }).add_task(monitor);

    for tick in 1..=25 {
        scheduler.run_due(start + period * tick);
    }

    let stats = scheduler.stats();
    assert_eq!(stats.failures, 13);
    assert_eq!(stats.runs, 37);
    assert_rate(metrics.short_rate(), 20.0);
}
