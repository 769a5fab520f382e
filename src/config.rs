//! Tunables for delay shapes, failure odds, cache lifetime, and queue sizing.
//!
//! Defaults replicate the load shape the services were designed around; tests
//! and soak harnesses override individual fields.

use std::time::Duration;

use crate::simulate::DelayRange;

/// Guest directory tunables.
#[derive(Debug, Clone)]
pub struct GuestConfig {
    /// Delay injected on create.
    pub create_delay: DelayRange,
    /// Delay injected on update.
    pub update_delay: DelayRange,
    /// Size of the random-sample result.
    pub sample_size: usize,
    /// Upper bound on rows returned by the deliberately slow query.
    pub slow_query_limit: usize,
    /// Multiplier driving the slow query's cross-product width.
    pub slow_query_fanout: usize,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            create_delay: DelayRange::new(100, 300),
            update_delay: DelayRange::new(150, 400),
            sample_size: 10,
            slow_query_limit: 100,
            slow_query_fanout: 1000,
        }
    }
}

/// RSVP service tunables.
#[derive(Debug, Clone)]
pub struct RsvpConfig {
    /// Delay injected on submission.
    pub submit_delay: DelayRange,
    /// Delay injected while computing statistics.
    pub stats_delay: DelayRange,
    /// Delay the confirmation job takes before recording its counter.
    pub confirmation_delay: DelayRange,
    /// Confirmation failure odds, as one-in-N. Zero disables failures.
    pub confirmation_failure_one_in: u32,
}

impl Default for RsvpConfig {
    fn default() -> Self {
        Self {
            submit_delay: DelayRange::new(200, 500),
            stats_delay: DelayRange::new(300, 700),
            confirmation_delay: DelayRange::new(1000, 2000),
            confirmation_failure_one_in: 0,
        }
    }
}

/// Event/dashboard service tunables.
#[derive(Debug, Clone)]
pub struct EventConfig {
    /// Delay injected on an event-details cache miss.
    pub details_delay: DelayRange,
    /// Iteration count of the CPU-bound workload.
    pub cpu_iterations: u64,
    /// How long the memory test holds its blocks.
    pub memory_hold: Duration,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            details_delay: DelayRange::new(100, 300),
            cpu_iterations: 1_000_000,
            memory_hold: Duration::from_secs(1),
        }
    }
}

/// External call simulator tunables.
#[derive(Debug, Clone)]
pub struct ExternalConfig {
    /// Delay injected on weather lookups.
    pub weather_delay: DelayRange,
    /// Weather failure odds, as one-in-N.
    pub weather_failure_one_in: u32,
    /// Delay injected on directions lookups.
    pub directions_delay: DelayRange,
    /// Directions failure odds, as one-in-N.
    pub directions_failure_one_in: u32,
    /// Fixed block duration of the timeout simulation.
    pub timeout_duration: Duration,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            weather_delay: DelayRange::new(500, 2000),
            weather_failure_one_in: 10,
            directions_delay: DelayRange::new(300, 1500),
            directions_failure_one_in: 15,
            timeout_duration: Duration::from_secs(10),
        }
    }
}

/// Top-level configuration shared by the service constructors.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub guest: GuestConfig,
    pub rsvp: RsvpConfig,
    pub event: EventConfig,
    pub external: ExternalConfig,
    pub cache: CacheConfig,
    pub notifications: NotifyConfig,
}

/// Cache tunables.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time entries remain valid before reads treat them as misses.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(300) }
    }
}

/// Notification dispatcher tunables.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Bounded queue capacity; submission blocks once saturated.
    pub queue_capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { queue_capacity: 64 }
    }
}
