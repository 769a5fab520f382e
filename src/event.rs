//! Event details, dashboard aggregation, and resource-pressure workloads.
//!
//! `event_details` is the one cached singleton in the system: a fixed cache
//! key with no write path behind it, so TTL expiry is its only invalidation.
//! An empty store yields a synthesized placeholder dated 30 days out, cached
//! but never persisted.
//!
//! The CPU and memory workloads exist purely to occupy resources for a
//! measurable, instrumented duration.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{Cache, CacheKey, CachedValue};
use crate::config::EventConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::guest::GuestService;
use crate::model::WeddingEvent;
use crate::rsvp::{RsvpService, RsvpStats};
use crate::simulate::Simulator;
use crate::store::EventStore;
use crate::telemetry::{MetricSink, Tags};

const BLOCK_BYTES: usize = 1024 * 1024;

/// Cross-service dashboard aggregate. Always reflects live sub-service state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_guests: u64,
    pub plus_one_guests: u64,
    pub total_events: u64,
    pub rsvp_stats: RsvpStats,
    pub last_updated: DateTime<Utc>,
}

/// Outcome of the CPU-bound synthetic workload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuTaskReport {
    pub iterations: u64,
    pub result: f64,
    pub duration_ms: u64,
}

/// Outcome of the memory-pressure workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryTestReport {
    pub allocated_mb: usize,
    pub duration_ms: u64,
}

/// Service over the event record plus cross-cutting aggregation.
pub struct EventService {
    events: Arc<dyn EventStore>,
    guests: Arc<GuestService>,
    rsvps: Arc<RsvpService>,
    cache: Arc<dyn Cache>,
    metrics: Arc<dyn MetricSink>,
    simulator: Simulator,
    config: EventConfig,
}

impl EventService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: Arc<dyn EventStore>,
        guests: Arc<GuestService>,
        rsvps: Arc<RsvpService>,
        cache: Arc<dyn Cache>,
        metrics: Arc<dyn MetricSink>,
        simulator: Simulator,
        config: EventConfig,
    ) -> Self {
        Self { events, guests, rsvps, cache, metrics, simulator, config }
    }

    /// The current event, cached under a single fixed key.
    pub async fn event_details(&self) -> ServiceResult<WeddingEvent> {
        self.metrics.increment("event.details.access", &Tags::new());

        let key = CacheKey::event_details();
        if let Some(event) = self.cache.get(&key).and_then(CachedValue::into_event) {
            self.record_cache_access(true);
            return Ok(event);
        }
        self.record_cache_access(false);

        self.simulator.delay(self.config.details_delay).await;
        let event = match self.events.first_by_date().await? {
            Some(event) => event,
            // Empty store: synthesize a placeholder without persisting it.
            None => default_event(),
        };
        self.cache.put(key, CachedValue::Event(event.clone()));
        Ok(event)
    }

    /// Fan-in aggregate over guests, RSVPs, and events. No caching of its own.
    pub async fn dashboard_stats(&self) -> ServiceResult<DashboardStats> {
        let (total_guests, plus_one_guests, rsvp_stats, total_events) = futures::try_join!(
            self.guests.total_count(),
            self.guests.plus_one_count(),
            self.rsvps.calculate_stats(),
            self.events.count(),
        )?;

        self.metrics.increment("dashboard.accessed", &Tags::new());

        Ok(DashboardStats {
            total_guests,
            plus_one_guests,
            total_events,
            rsvp_stats,
            last_updated: Utc::now(),
        })
    }

    /// Fixed floating-point workload that occupies a CPU for a measurable
    /// span. Runs on a blocking thread so the async workers stay responsive.
    pub async fn cpu_intensive_task(&self) -> ServiceResult<CpuTaskReport> {
        let iterations = self.config.cpu_iterations;
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            let mut acc = 0.0_f64;
            for i in 0..iterations {
                let x = i as f64;
                acc += x.sqrt() * x.sin() * x.cos();
            }
            acc
        })
        .await
        .map_err(|err| {
            ServiceError::ResourceExhausted(format!("cpu workload thread failed: {err}"))
        })?;

        let elapsed = started.elapsed();
        self.metrics.record_duration("perf.cpu.duration", &Tags::new(), elapsed);
        Ok(CpuTaskReport { iterations, result, duration_ms: elapsed.as_millis() as u64 })
    }

    /// Allocate and touch `size_mb` one-megabyte blocks, hold them briefly,
    /// then release. Fails with `ResourceExhausted` when the allocator says
    /// no, for the block table and for each block alike.
    pub async fn memory_test(&self, size_mb: usize) -> ServiceResult<MemoryTestReport> {
        let started = Instant::now();

        let mut blocks: Vec<Vec<u8>> = Vec::new();
        if blocks.try_reserve_exact(size_mb).is_err() {
            self.metrics.increment("perf.memory.oom", &Tags::new());
            return Err(ServiceError::ResourceExhausted(format!(
                "could not allocate {size_mb} MB"
            )));
        }
        for _ in 0..size_mb {
            let mut block: Vec<u8> = Vec::new();
            if block.try_reserve_exact(BLOCK_BYTES).is_err() {
                self.metrics.increment("perf.memory.oom", &Tags::new());
                return Err(ServiceError::ResourceExhausted(format!(
                    "could not allocate {size_mb} MB"
                )));
            }
            block.resize(BLOCK_BYTES, 0);
            // Touch the block so the pages are really backed.
            for j in (0..BLOCK_BYTES).step_by(1000) {
                block[j] = (j % 256) as u8;
            }
            blocks.push(block);
        }

        self.simulator.delay_exact(self.config.memory_hold).await;
        drop(blocks);

        let elapsed = started.elapsed();
        self.metrics.set_gauge("perf.memory.allocated_mb", &Tags::new(), size_mb as f64);
        self.metrics.record_duration("perf.memory.duration", &Tags::new(), elapsed);
        Ok(MemoryTestReport { allocated_mb: size_mb, duration_ms: elapsed.as_millis() as u64 })
    }

    /// Events dated after now, ordered by date.
    pub async fn upcoming_events(&self) -> ServiceResult<Vec<WeddingEvent>> {
        self.events.upcoming(Utc::now()).await
    }

    /// All events ordered by date.
    pub async fn all_events(&self) -> ServiceResult<Vec<WeddingEvent>> {
        self.events.all_by_date().await
    }

    fn record_cache_access(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.metrics.increment("cache.access", &Tags::with("kind", "event").and("result", result));
    }
}

/// The placeholder surfaced when no event has been stored yet.
fn default_event() -> WeddingEvent {
    let mut event = WeddingEvent::new("Wedding Ceremony", Utc::now() + ChronoDuration::days(30));
    event.description = Some("Join us for our special day!".into());
    event.venue_name = Some("Beautiful Gardens".into());
    event.venue_address = Some("123 Garden Lane, City, State".into());
    event.dress_code = Some("Formal".into());
    event
}
