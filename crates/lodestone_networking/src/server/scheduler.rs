//! # Scheduler
//!
//! Cooperative fixed-period task runner for the scheduler thread.
//!
//! ## Design
//!
//! - Every task runs to completion before the next one starts
//! - Due tasks run in registration order
//! - A failed invocation is logged and the task stays scheduled
//! - A task that falls behind runs once and is rescheduled a full period
//!   from now, never in a burst

use std::time::{Duration, Instant};

use crate::error::TaskResult;

/// Work the scheduler runs periodically.
pub trait ScheduledTask: Send {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Runs one invocation at `now`.
    ///
    /// # Errors
    ///
    /// Any [`crate::error::TaskError`]; the scheduler logs it and keeps
    /// the task.
    fn run(&mut self, now: Instant) -> TaskResult;
}

/// Invocation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Successful invocations.
    pub runs: u64,
    /// Failed invocations.
    pub failures: u64,
}

struct Entry {
    task: Box<dyn ScheduledTask>,
    period: Duration,
    next_due: Instant,
}

/// Fixed-period runner for [`ScheduledTask`]s.
pub struct Scheduler {
    period: Duration,
    start: Instant,
    entries: Vec<Entry>,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Creates a scheduler whose tasks first fall due one `period` after
    /// `start`.
    #[must_use]
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            start,
            entries: Vec::new(),
            stats: SchedulerStats::default(),
        }
    }

    /// Default period for new tasks.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Number of scheduled tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invocation counters.
    #[must_use]
    pub const fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Schedules `task` at the default period.
    pub fn add_task(&mut self, task: impl ScheduledTask + 'static) -> &mut Self {
        self.add_task_every(task, self.period)
    }

    /// Schedules `task` at its own period.
    pub fn add_task_every(
        &mut self,
        task: impl ScheduledTask + 'static,
        period: Duration,
    ) -> &mut Self {
        tracing::debug!("Scheduled {} every {:?}", task.name(), period);
        self.entries.push(Entry {
            task: Box::new(task),
            period,
            next_due: self.start + period,
        });
        self
    }

    /// Runs every task due at `now` once. Returns how many ran.
    pub fn run_due(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        for entry in &mut self.entries {
            if entry.next_due > now {
                continue;
            }
            match entry.task.run(now) {
                Ok(()) => self.stats.runs += 1,
                Err(e) => {
                    self.stats.failures += 1;
                    tracing::warn!("Scheduled task {} failed: {}", entry.task.name(), e);
                }
            }
            ran += 1;

            entry.next_due += entry.period;
            if entry.next_due <= now {
                entry.next_due = now + entry.period;
            }
        }
        ran
    }

    /// Runs every task once regardless of due time.
    pub fn run_once(&mut self, now: Instant) -> usize {
        for entry in &mut self.entries {
            entry.next_due = now;
        }
        self.run_due(now)
    }

    /// Time until the earliest task falls due, zero if one is overdue.
    #[must_use]
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.entries
            .iter()
            .map(|e| e.next_due.saturating_duration_since(now))
            .min()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("period", &self.period)
            .field(
                "tasks",
                &self.entries.iter().map(|e| e.task.name()).collect::<Vec<_>>(),
            )
            .field("stats", &self.stats)
            .finish()
    }
}
