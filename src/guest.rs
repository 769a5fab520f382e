//! Guest directory: CRUD, search, and the error/latency injection hooks.
//!
//! Semantics:
//! - `create`/`update` run a best-effort duplicate-email fast-fail before
//!   hitting the store; the store's own uniqueness guard remains the final
//!   authority against concurrent duplicates.
//! - `get_by_id` is a read-through cache lookup; every write path for an id
//!   invalidates that id's entry, so a read after a write never serves the
//!   pre-write field values.
//! - `slow_query`, `random_sample`, and `simulate_database_error` exist to
//!   shape traces: an outlier-latency sample, result variety, and a
//!   deterministic error path.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::{Cache, CacheKey, CachedValue};
use crate::config::GuestConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::model::{Guest, GuestDetails};
use crate::simulate::Simulator;
use crate::store::{GuestStore, PageResult};
use crate::telemetry::{MetricSink, Tags};

/// Service over the guest directory.
pub struct GuestService {
    store: Arc<dyn GuestStore>,
    cache: Arc<dyn Cache>,
    metrics: Arc<dyn MetricSink>,
    simulator: Simulator,
    config: GuestConfig,
}

impl GuestService {
    pub fn new(
        store: Arc<dyn GuestStore>,
        cache: Arc<dyn Cache>,
        metrics: Arc<dyn MetricSink>,
        simulator: Simulator,
        config: GuestConfig,
    ) -> Self {
        Self { store, cache, metrics, simulator, config }
    }

    /// One page of guests, optionally filtered by a case-insensitive
    /// substring match on first name, last name, or email.
    pub async fn list(
        &self,
        page: usize,
        page_size: usize,
        search: Option<&str>,
    ) -> ServiceResult<PageResult<Guest>> {
        self.metrics.increment("guest.list.access", &Tags::new());
        self.store.page(page, page_size, search).await
    }

    /// Validate, simulate processing, and persist a new guest.
    pub async fn create(&self, details: GuestDetails) -> ServiceResult<Guest> {
        details.validate()?;
        self.simulator.delay(self.config.create_delay).await;

        // Fast-fail on a visible duplicate; the store re-checks under its own
        // lock for races.
        if self.store.find_by_email(&details.email).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "guest with email {} already exists",
                details.email
            )));
        }

        let guest = self.store.insert(details).await?;
        self.metrics.increment("guest.created", &Tags::new());
        Ok(guest)
    }

    /// Cache-first single-guest lookup.
    pub async fn get_by_id(&self, id: u64) -> ServiceResult<Guest> {
        let key = CacheKey::guest(id);
        if let Some(guest) = self.cache.get(&key).and_then(CachedValue::into_guest) {
            self.record_cache_access("guest", true);
            return Ok(guest);
        }
        self.record_cache_access("guest", false);

        let guest =
            self.store.get(id).await?.ok_or_else(|| ServiceError::not_found("guest", id))?;
        self.cache.put(key, CachedValue::Guest(guest.clone()));
        Ok(guest)
    }

    /// Overwrite all mutable fields of an existing guest.
    pub async fn update(&self, id: u64, details: GuestDetails) -> ServiceResult<Guest> {
        details.validate()?;
        // Existence check rides the cached lookup; the write below invalidates
        // whatever that populated.
        self.get_by_id(id).await?;

        self.simulator.delay(self.config.update_delay).await;
        let updated = self.store.update(id, details).await?;
        self.cache.invalidate(&CacheKey::guest(id));
        self.metrics.increment("guest.updated", &Tags::new());
        Ok(updated)
    }

    /// Remove a guest. Any RSVP for the guest is left in place.
    pub async fn delete(&self, id: u64) -> ServiceResult<()> {
        self.get_by_id(id).await?;
        self.store.remove(id).await?;
        self.cache.invalidate(&CacheKey::guest(id));
        self.metrics.increment("guest.deleted", &Tags::new());
        Ok(())
    }

    /// Deliberately expensive read producing an outlier-latency trace sample.
    pub async fn slow_query(&self) -> ServiceResult<Vec<Guest>> {
        let started = Instant::now();
        let rows = self
            .store
            .cross_join_scan(self.config.slow_query_fanout, self.config.slow_query_limit)
            .await?;
        self.metrics.record_duration(
            "db.query.duration",
            &Tags::with("query", "slow_scan"),
            started.elapsed(),
        );
        Ok(rows)
    }

    /// Fixed-size unordered-random subset of guests.
    pub async fn random_sample(&self) -> ServiceResult<Vec<Guest>> {
        let started = Instant::now();
        let sample = self.store.sample(self.config.sample_size).await?;
        self.metrics.record_duration(
            "db.query.duration",
            &Tags::with("query", "random_sample"),
            started.elapsed(),
        );
        Ok(sample)
    }

    /// Error-injection endpoint: always fails with a storage-shaped error.
    pub async fn simulate_database_error(&self) -> ServiceResult<()> {
        self.metrics.increment(
            "errors",
            &Tags::with("type", "database").and("endpoint", "guests"),
        );
        Err(ServiceError::SimulatedFault("simulated database connection error".into()))
    }

    /// Total guest count, for the dashboard aggregator.
    pub async fn total_count(&self) -> ServiceResult<u64> {
        self.store.count().await
    }

    /// Count of guests bringing a plus-one, for the dashboard aggregator.
    pub async fn plus_one_count(&self) -> ServiceResult<u64> {
        self.store.count_plus_one().await
    }

    fn record_cache_access(&self, kind: &str, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.metrics
            .increment("cache.access", &Tags::with("kind", kind.to_string()).and("result", result));
    }
}
