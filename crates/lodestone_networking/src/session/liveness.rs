//! # Liveness Monitor
//!
//! Two independent clocks decide whether a peer is still there:
//!
//! ```text
//! short clock ── reset by ANY inbound traffic ──────── > 30 s  → "timed out"
//! long clock  ── reset by a verified ping echo ─────── > 120 s → "no ping response"
//! ```
//!
//! A peer that keeps sending bytes but never answers a challenge trips the
//! long clock; a peer that goes silent trips the short one.
//!
//! Challenges go out every `short_timeout / repeat_rate` and are remembered
//! in a ring of `repeat_rate` slots, so an echo older than that many
//! challenges no longer matches anything.
//!
//! Time is advanced explicitly with [`LivenessMonitor::tick`], which keeps
//! the monitor deterministic under test.

use std::time::Duration;

use lodestone_core::RingBuffer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::LivenessConfig;

/// An outstanding ping challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PingChallenge {
    /// Random non-negative hash the peer must echo.
    pub hash: i32,
    /// Monitor clock when the challenge was issued.
    pub sent_at: Duration,
}

/// Which clock expired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutKind {
    /// No inbound traffic at all.
    Traffic,
    /// No verified round trip.
    PingResponse,
}

/// Monitor state. `TimedOut` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LivenessState {
    /// Peer considered alive.
    Active,
    /// A clock expired.
    TimedOut(TimeoutKind),
}

/// What one [`LivenessMonitor::tick`] asks the session to do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LivenessTick {
    /// Hash of a challenge to send now.
    pub challenge: Option<i32>,
    /// Set on the tick the monitor times out.
    pub timeout: Option<TimeoutKind>,
}

/// Dual-clock keep-alive tracker for one session.
#[derive(Debug)]
pub struct LivenessMonitor {
    short_timeout: Duration,
    long_timeout: Duration,
    ping_period: Duration,
    clock: Duration,
    ping_timer: Duration,
    since_traffic: Duration,
    since_round_trip: Duration,
    challenges: RingBuffer<PingChallenge>,
    latency: Option<Duration>,
    state: LivenessState,
    rng: StdRng,
}

impl LivenessMonitor {
    /// Creates a monitor seeded from the OS.
    #[must_use]
    pub fn new(config: &LivenessConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Creates a monitor with a caller-supplied generator.
    #[must_use]
    pub fn with_rng(config: &LivenessConfig, rng: StdRng) -> Self {
        let ping_period = config.ping_period();
        Self {
            short_timeout: config.short_timeout(),
            long_timeout: config.long_timeout(),
            ping_period,
            clock: Duration::ZERO,
            // First tick issues a challenge immediately
            ping_timer: ping_period,
            since_traffic: Duration::ZERO,
            since_round_trip: Duration::ZERO,
            challenges: RingBuffer::with_capacity(config.challenge_capacity()),
            latency: None,
            state: LivenessState::Active,
            rng,
        }
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> LivenessState {
        self.state
    }

    /// Last measured round-trip time.
    #[inline]
    #[must_use]
    pub const fn latency(&self) -> Option<Duration> {
        self.latency
    }

    /// Time since the monitor was created.
    #[inline]
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.clock
    }

    /// Outstanding challenges, oldest first.
    pub fn challenges(&self) -> impl Iterator<Item = &PingChallenge> + '_ {
        self.challenges.iter()
    }

    /// Advances both clocks by `dt`.
    ///
    /// Returns the challenge to send, or the timeout that just fired. After
    /// a timeout every later call is a no-op.
    pub fn tick(&mut self, dt: Duration) -> LivenessTick {
        if self.state != LivenessState::Active {
            return LivenessTick::default();
        }

        self.clock += dt;
        self.ping_timer += dt;
        self.since_traffic += dt;
        self.since_round_trip += dt;

        let timeout = if self.since_traffic > self.short_timeout {
            Some(TimeoutKind::Traffic)
        } else if self.since_round_trip > self.long_timeout {
            Some(TimeoutKind::PingResponse)
        } else {
            None
        };

        if let Some(kind) = timeout {
            self.state = LivenessState::TimedOut(kind);
            return LivenessTick {
                challenge: None,
                timeout: Some(kind),
            };
        }

        let challenge = if self.ping_timer >= self.ping_period {
            self.ping_timer -= self.ping_period;
            Some(self.issue_challenge())
        } else {
            None
        };

        LivenessTick {
            challenge,
            timeout: None,
        }
    }

    /// Records a new challenge and returns its hash.
    ///
    /// Overwrites the oldest challenge once `repeat_rate` are outstanding.
    pub fn issue_challenge(&mut self) -> i32 {
        let hash = self.rng.gen_range(0..i32::MAX);
        self.challenges.push(PingChallenge {
            hash,
            sent_at: self.clock,
        });
        hash
    }

    /// Resets the short clock. Called for every inbound frame.
    #[inline]
    pub fn record_traffic(&mut self) {
        self.since_traffic = Duration::ZERO;
    }

    /// Handles an echoed hash.
    ///
    /// A match resets the long clock and returns the round-trip time. An
    /// echo that matches nothing (never issued, or already overwritten) is
    /// ignored. Either way the echo counts as traffic.
    pub fn respond(&mut self, hash: i32) -> Option<Duration> {
        self.record_traffic();

        let sent_at = self
            .challenges
            .iter()
            .find(|challenge| challenge.hash == hash)
            .map(|challenge| challenge.sent_at)?;

        let latency = self.clock.saturating_sub(sent_at);
        self.latency = Some(latency);
        self.since_round_trip = Duration::ZERO;
        Some(latency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> LivenessMonitor {
        LivenessMonitor::with_rng(&LivenessConfig::default(), StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_first_tick_issues_challenge() {
        let mut m = monitor();

        let tick = m.tick(Duration::from_millis(50));
        assert!(tick.challenge.is_some());
        assert_eq!(m.challenges().count(), 1);

        // Next challenge only after a full period
        assert!(m.tick(Duration::from_millis(50)).challenge.is_none());
    }

    #[test]
    fn test_challenge_rate() {
        let mut m = monitor();
        let mut issued = 0;

        // 30 s at 50 ms per tick
        for _ in 0..600 {
            if m.tick(Duration::from_millis(50)).challenge.is_some() {
                issued += 1;
            }
            m.record_traffic();
        }

        assert_eq!(issued, 8);
    }

    #[test]
    fn test_hashes_are_non_negative() {
        let mut m = monitor();
        for _ in 0..1000 {
            assert!(m.issue_challenge() >= 0);
        }
    }

    #[test]
    fn test_response_measures_latency() {
        let mut m = monitor();
        let hash = m.tick(Duration::from_millis(50)).challenge.unwrap();

        m.tick(Duration::from_millis(200));
        assert_eq!(m.respond(hash), Some(Duration::from_millis(200)));
        assert_eq!(m.latency(), Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_unknown_echo_is_ignored() {
        let mut m = monitor();
        m.tick(Duration::from_millis(50));

        assert_eq!(m.respond(-5), None);
        assert_eq!(m.latency(), None);
    }

    #[test]
    fn test_timeout_is_terminal() {
        let mut m = monitor();
        let fired = m.tick(Duration::from_secs(31));

        assert_eq!(fired.timeout, Some(TimeoutKind::Traffic));
        assert_eq!(m.state(), LivenessState::TimedOut(TimeoutKind::Traffic));
        assert_eq!(m.tick(Duration::from_secs(1)), LivenessTick::default());
    }
}
