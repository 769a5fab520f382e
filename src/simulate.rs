//! Latency and failure simulation.
//!
//! Every operation in the crate funnels its artificial variance through a
//! [`Simulator`]: a uniformly-distributed delay inside a bounded range and a
//! one-in-N failure decision. Both sides sit behind traits so tests can run
//! without real time ([`InstantSleeper`]) and with scripted outcomes
//! ([`ScriptedFaults`]).
//!
//! Invariants:
//! - `delay` always suspends for a duration in `[min, max]` (inclusive).
//! - `should_fail(n)` is true with probability `1/n`; `n == 0` never fails.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An inclusive delay range in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    /// Build a range; `min` and `max` are swapped if given out of order.
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        if min_ms <= max_ms {
            Self { min_ms, max_ms }
        } else {
            Self { min_ms: max_ms, max_ms: min_ms }
        }
    }
}

/// Abstraction over waiting, so tests can skip real time.
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Test sleeper that completes immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async {})
    }
}

/// Test sleeper that records every requested duration without waiting.
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    requested: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// All durations requested so far, in order.
    pub fn requested(&self) -> Vec<Duration> {
        self.requested.lock().expect("tracking sleeper poisoned").clone()
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.requested.lock().expect("tracking sleeper poisoned").push(duration);
        Box::pin(async {})
    }
}

/// Source of one-in-N failure decisions.
pub trait FaultSource: Send + Sync + std::fmt::Debug {
    /// True with probability `1/one_in`. `one_in == 0` must return false.
    fn roll(&self, one_in: u32) -> bool;
}

/// Production fault source using the process-wide thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngFaults;

impl FaultSource for ThreadRngFaults {
    fn roll(&self, one_in: u32) -> bool {
        if one_in == 0 {
            return false;
        }
        rand::rng().random_range(0..one_in) == 0
    }
}

/// Reproducible fault source seeded for tests and soak runs.
#[derive(Debug)]
pub struct SeededFaults {
    rng: Mutex<StdRng>,
}

impl SeededFaults {
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl FaultSource for SeededFaults {
    fn roll(&self, one_in: u32) -> bool {
        if one_in == 0 {
            return false;
        }
        self.rng.lock().expect("seeded fault source poisoned").random_range(0..one_in) == 0
    }
}

/// Fault source with a fixed queue of outcomes; returns false when exhausted.
#[derive(Debug, Default)]
pub struct ScriptedFaults {
    outcomes: Mutex<VecDeque<bool>>,
}

impl ScriptedFaults {
    pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self { outcomes: Mutex::new(outcomes.into_iter().collect()) }
    }

    /// A source that never fails.
    pub fn none() -> Self {
        Self::default()
    }

    /// A source whose next `n` rolls all fail.
    pub fn failing(n: usize) -> Self {
        Self::new(std::iter::repeat(true).take(n))
    }
}

impl FaultSource for ScriptedFaults {
    fn roll(&self, _one_in: u32) -> bool {
        self.outcomes.lock().expect("scripted fault source poisoned").pop_front().unwrap_or(false)
    }
}

/// Combined latency/failure simulator shared by every service.
#[derive(Debug, Clone)]
pub struct Simulator {
    sleeper: Arc<dyn Sleeper>,
    faults: Arc<dyn FaultSource>,
}

impl Simulator {
    pub fn new(sleeper: Arc<dyn Sleeper>, faults: Arc<dyn FaultSource>) -> Self {
        Self { sleeper, faults }
    }

    /// Production simulator: real tokio sleeps, thread-local RNG.
    pub fn realtime() -> Self {
        Self::new(Arc::new(TokioSleeper), Arc::new(ThreadRngFaults))
    }

    /// Test simulator: no real waiting, caller-scripted failures.
    pub fn instant(faults: Arc<dyn FaultSource>) -> Self {
        Self::new(Arc::new(InstantSleeper), faults)
    }

    /// Suspend for a uniformly-distributed duration inside `range`.
    pub async fn delay(&self, range: DelayRange) {
        let millis = if range.min_ms == range.max_ms {
            range.min_ms
        } else {
            rand::rng().random_range(range.min_ms..=range.max_ms)
        };
        self.sleeper.sleep(Duration::from_millis(millis)).await;
    }

    /// Suspend for exactly `duration`.
    pub async fn delay_exact(&self, duration: Duration) {
        self.sleeper.sleep(duration).await;
    }

    /// One-in-N failure decision.
    pub fn should_fail(&self, one_in: u32) -> bool {
        self.faults.roll(one_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_range_swaps_inverted_bounds() {
        let range = DelayRange::new(400, 150);
        assert_eq!(range.min_ms, 150);
        assert_eq!(range.max_ms, 400);
    }

    #[tokio::test]
    async fn delay_stays_inside_bounds() {
        let sleeper = TrackingSleeper::new();
        let sim = Simulator::new(Arc::new(sleeper.clone()), Arc::new(ScriptedFaults::none()));

        for _ in 0..200 {
            sim.delay(DelayRange::new(100, 300)).await;
        }

        let requested = sleeper.requested();
        assert_eq!(requested.len(), 200);
        for duration in requested {
            assert!(duration >= Duration::from_millis(100));
            assert!(duration <= Duration::from_millis(300));
        }
    }

    #[tokio::test]
    async fn degenerate_range_is_exact() {
        let sleeper = TrackingSleeper::new();
        let sim = Simulator::new(Arc::new(sleeper.clone()), Arc::new(ScriptedFaults::none()));
        sim.delay(DelayRange::new(250, 250)).await;
        assert_eq!(sleeper.requested(), vec![Duration::from_millis(250)]);
    }

    #[test]
    fn zero_odds_never_fail() {
        assert!(!ThreadRngFaults.roll(0));
        assert!(!SeededFaults::new(7).roll(0));
    }

    #[test]
    fn one_in_one_always_fails() {
        let faults = SeededFaults::new(7);
        for _ in 0..50 {
            assert!(faults.roll(1));
        }
    }

    #[test]
    fn seeded_faults_land_near_expected_rate() {
        let faults = SeededFaults::new(42);
        let failures = (0..10_000).filter(|_| faults.roll(10)).count();
        // 1-in-10 over 10k rolls; allow generous sampling tolerance.
        assert!((700..=1300).contains(&failures), "observed {failures} failures");
    }

    #[test]
    fn scripted_faults_follow_queue_then_pass() {
        let faults = ScriptedFaults::new([true, false, true]);
        assert!(faults.roll(10));
        assert!(!faults.roll(10));
        assert!(faults.roll(10));
        assert!(!faults.roll(10)); // exhausted
    }

    #[tokio::test]
    async fn instant_sleeper_does_not_wait() {
        let start = std::time::Instant::now();
        InstantSleeper.sleep(Duration::from_secs(10)).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
