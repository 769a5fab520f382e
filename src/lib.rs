#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Banquet
//!
//! A simulated event-RSVP service layer built to exercise observability
//! tooling. Every operation carries realistic latency, probabilistic
//! failures, cache traffic, and a tagged metric taxonomy, with no real
//! network or database behind it.
//!
//! ## Features
//!
//! - **Guest management** with validation, duplicate-email rejection, and a
//!   read-through TTL cache
//! - **RSVP submission** with fire-and-forget confirmation emails over a
//!   bounded queue
//! - **Event details and dashboard stats** fanned in from the other services
//! - **External weather/maps simulation** with tunable failure odds
//! - **Deterministic testing**: instant sleepers, seeded and scripted fault
//!   sources, an in-memory metric registry
//!
//! ## Quick Start
//!
//! ```rust
//! use banquet::config::GuestConfig;
//! use banquet::guest::GuestService;
//! use banquet::model::GuestDetails;
//! use banquet::simulate::{ScriptedFaults, Simulator};
//! use banquet::store::InMemoryGuestStore;
//! use banquet::telemetry::{MetricRegistry, NullSink};
//! use banquet::cache::TtlCache;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = GuestService::new(
//!         Arc::new(InMemoryGuestStore::new()),
//!         Arc::new(TtlCache::new(Duration::from_secs(300))),
//!         Arc::new(NullSink),
//!         Simulator::instant(Arc::new(ScriptedFaults::none())),
//!         GuestConfig::default(),
//!     );
//!
//!     let guest = service
//!         .create(GuestDetails::new("Ada", "Lovelace", "ada@example.com"))
//!         .await
//!         .unwrap();
//!     assert_eq!(guest.full_name(), "Ada Lovelace");
//!
//!     // MetricRegistry stands in for a real sink when tests need to assert
//!     // on what was recorded.
//!     let _registry = MetricRegistry::new();
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod external;
pub mod guest;
pub mod model;
pub mod notify;
pub mod rsvp;
pub mod simulate;
pub mod store;
pub mod telemetry;

// Re-exports
pub use cache::{Cache, CacheKey, CachedValue, TtlCache};
pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use event::{DashboardStats, EventService};
pub use external::{DirectionsReport, ExternalApi, WeatherReport};
pub use guest::GuestService;
pub use model::{Guest, GuestDetails, Rsvp, RsvpRequest, RsvpStatus, WeddingEvent};
pub use notify::NotificationQueue;
pub use rsvp::{RsvpService, RsvpStats};
pub use simulate::{
    DelayRange, FaultSource, InstantSleeper, ScriptedFaults, SeededFaults, Simulator, Sleeper,
    ThreadRngFaults, TokioSleeper, TrackingSleeper,
};
pub use store::{
    EventStore, GuestStore, InMemoryEventStore, InMemoryGuestStore, InMemoryRsvpStore, PageResult,
    RsvpStore,
};
pub use telemetry::{FanoutSink, LogSink, MetricRegistry, MetricSink, NullSink, Tags};
