//! End-to-end scenarios wiring the full service graph with instant sleepers,
//! scripted fault sources, and the in-memory metric registry.

use banquet::cache::TtlCache;
use banquet::config::{
    EventConfig, ExternalConfig, GuestConfig, NotifyConfig, RsvpConfig,
};
use banquet::event::EventService;
use banquet::external::ExternalApi;
use banquet::guest::GuestService;
use banquet::model::{GuestDetails, RsvpRequest, RsvpStatus};
use banquet::notify::NotificationQueue;
use banquet::rsvp::RsvpService;
use banquet::simulate::{ScriptedFaults, SeededFaults, Simulator};
use banquet::store::{
    EventStore, InMemoryEventStore, InMemoryGuestStore, InMemoryRsvpStore,
};
use banquet::telemetry::{MetricRegistry, Tags};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

/// The whole service graph on one registry, with no real sleeping.
struct Harness {
    guests: Arc<GuestService>,
    rsvps: Arc<RsvpService>,
    events: EventService,
    event_store: Arc<InMemoryEventStore>,
    cache: Arc<TtlCache>,
    notifier: Arc<NotificationQueue>,
    registry: Arc<MetricRegistry>,
}

impl Harness {
    fn new() -> Self {
        let registry = Arc::new(MetricRegistry::new());
        let simulator = Simulator::instant(Arc::new(ScriptedFaults::none()));
        let cache = Arc::new(TtlCache::new(Duration::from_secs(300)));

        let guests = Arc::new(GuestService::new(
            Arc::new(InMemoryGuestStore::new()),
            cache.clone(),
            registry.clone(),
            simulator.clone(),
            GuestConfig::default(),
        ));

        let notifier = Arc::new(NotificationQueue::new(
            NotifyConfig::default(),
            RsvpConfig::default(),
            simulator.clone(),
            registry.clone(),
        ));
        let rsvps = Arc::new(RsvpService::new(
            Arc::new(InMemoryRsvpStore::new()),
            registry.clone(),
            simulator.clone(),
            notifier.clone(),
            RsvpConfig::default(),
        ));

        let event_store = Arc::new(InMemoryEventStore::new());
        let events = EventService::new(
            event_store.clone(),
            guests.clone(),
            rsvps.clone(),
            cache.clone(),
            registry.clone(),
            simulator,
            EventConfig { cpu_iterations: 10_000, ..EventConfig::default() },
        );

        Self { guests, rsvps, events, event_store, cache, notifier, registry }
    }
}

#[tokio::test]
async fn concurrent_duplicate_emails_admit_exactly_one_guest() {
    let harness = Arc::new(Harness::new());

    let mut handles = Vec::new();
    for i in 0..8 {
        let guests = harness.guests.clone();
        handles.push(tokio::spawn(async move {
            guests
                .create(GuestDetails::new(format!("G{i}"), "Shared", "shared@example.com"))
                .await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) if e.is_conflict() => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(harness.guests.total_count().await.unwrap(), 1);
}

#[tokio::test]
async fn second_rsvp_for_same_guest_is_rejected() {
    let harness = Harness::new();
    let guest = harness
        .guests
        .create(GuestDetails::new("Mia", "Wong", "mia@example.com"))
        .await
        .unwrap();

    harness
        .rsvps
        .submit(RsvpRequest::new(guest.id, RsvpStatus::Attending))
        .await
        .unwrap();

    let err = harness
        .rsvps
        .submit(RsvpRequest::new(guest.id, RsvpStatus::Maybe))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        err.to_string(),
        format!("conflict: RSVP already exists for guest ID: {}", guest.id)
    );
}

#[tokio::test]
async fn stats_partition_the_responses_and_compute_attendance_rate() {
    let harness = Harness::new();

    // Empty table first: the rate guard, not a division by zero.
    let empty = harness.rsvps.calculate_stats().await.unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.attendance_rate, 0.0);

    let statuses = [
        RsvpStatus::Attending,
        RsvpStatus::Attending,
        RsvpStatus::NotAttending,
        RsvpStatus::Maybe,
    ];
    for (i, status) in statuses.iter().enumerate() {
        let guest = harness
            .guests
            .create(GuestDetails::new(
                format!("Guest{i}"),
                "Stats",
                format!("stats{i}@example.com"),
            ))
            .await
            .unwrap();
        harness.rsvps.submit(RsvpRequest::new(guest.id, *status)).await.unwrap();
    }

    let stats = harness.rsvps.calculate_stats().await.unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.attending + stats.not_attending + stats.maybe, stats.total);
    assert_eq!(stats.attending, 2);
    assert_eq!(stats.attendance_rate, 50.0);

    let gauge = harness
        .registry
        .gauge_value("rsvp.attendance_rate", &Tags::new())
        .unwrap();
    assert_eq!(gauge, 50.0);
}

#[tokio::test]
async fn event_details_synthesize_a_future_default_and_stay_cached() {
    let harness = Harness::new();

    let first = harness.events.event_details().await.unwrap();
    assert!(first.id.is_none());
    assert_eq!(first.name, "Wedding Ceremony");
    assert!(first.event_date > Utc::now());

    // The default is cached under the fixed key just like a stored event, so
    // repeat lookups return the identical snapshot.
    let second = harness.events.event_details().await.unwrap();
    assert_eq!(first, second);

    let hit = Tags::with("kind", "event").and("result", "hit");
    let miss = Tags::with("kind", "event").and("result", "miss");
    assert_eq!(harness.registry.counter_value("cache.access", &miss), 1);
    assert_eq!(harness.registry.counter_value("cache.access", &hit), 1);
    assert_eq!(
        harness.registry.counter_value("event.details.access", &Tags::new()),
        2
    );
}

#[tokio::test]
async fn stored_event_preempts_the_synthesized_default() {
    let harness = Harness::new();
    let mut event = banquet::model::WeddingEvent::new(
        "Rehearsal Dinner",
        Utc::now() + ChronoDuration::days(10),
    );
    event = harness.event_store.insert(event).await.unwrap();

    let details = harness.events.event_details().await.unwrap();
    assert_eq!(details.id, event.id);
    assert_eq!(details.name, "Rehearsal Dinner");
}

#[tokio::test]
async fn guest_update_invalidates_the_cache_entry() {
    let harness = Harness::new();
    let guest = harness
        .guests
        .create(GuestDetails::new("Ana", "Reyes", "ana@example.com"))
        .await
        .unwrap();

    // Prime the cache, then mutate through the service.
    harness.guests.get_by_id(guest.id).await.unwrap();
    let mut details = GuestDetails::new("Ana", "Reyes-Lopez", "ana@example.com");
    details.plus_one = true;
    harness.guests.update(guest.id, details).await.unwrap();

    let reloaded = harness.guests.get_by_id(guest.id).await.unwrap();
    assert_eq!(reloaded.last_name, "Reyes-Lopez");
    assert!(reloaded.plus_one);

    // hit, then post-invalidation miss.
    let miss = Tags::with("kind", "guest").and("result", "miss");
    assert_eq!(harness.registry.counter_value("cache.access", &miss), 2);
}

#[tokio::test]
async fn deleted_guest_disappears_from_cache_and_store() {
    let harness = Harness::new();
    let guest = harness
        .guests
        .create(GuestDetails::new("Tom", "Hale", "tom@example.com"))
        .await
        .unwrap();
    harness.guests.get_by_id(guest.id).await.unwrap();

    harness.guests.delete(guest.id).await.unwrap();

    let err = harness.guests.get_by_id(guest.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(harness.cache.is_empty() || harness.cache.len() <= 1);
}

#[tokio::test]
async fn dashboard_fans_in_guest_rsvp_and_event_counts() {
    let harness = Harness::new();

    let mut details = GuestDetails::new("Ivy", "Chen", "ivy@example.com");
    details.plus_one = true;
    let ivy = harness.guests.create(details).await.unwrap();
    let ben = harness
        .guests
        .create(GuestDetails::new("Ben", "Okafor", "ben@example.com"))
        .await
        .unwrap();

    let mut req = RsvpRequest::new(ivy.id, RsvpStatus::Attending);
    req.plus_one_attending = true;
    harness.rsvps.submit(req).await.unwrap();
    harness
        .rsvps
        .submit(RsvpRequest::new(ben.id, RsvpStatus::NotAttending))
        .await
        .unwrap();

    harness
        .event_store
        .insert(banquet::model::WeddingEvent::new(
            "Ceremony",
            Utc::now() + ChronoDuration::days(5),
        ))
        .await
        .unwrap();

    let dashboard = harness.events.dashboard_stats().await.unwrap();
    assert_eq!(dashboard.total_guests, 2);
    assert_eq!(dashboard.plus_one_guests, 1);
    assert_eq!(dashboard.total_events, 1);
    assert_eq!(dashboard.rsvp_stats.total, 2);
    assert_eq!(dashboard.rsvp_stats.plus_one_attending, 1);
    assert!(dashboard.last_updated <= Utc::now());

    assert_eq!(
        harness.registry.counter_value("dashboard.accessed", &Tags::new()),
        1
    );
}

#[tokio::test]
async fn confirmation_emails_flow_through_the_queue() {
    let harness = Harness::new();
    let guest = harness
        .guests
        .create(GuestDetails::new("Sam", "Ortiz", "sam@example.com"))
        .await
        .unwrap();
    harness
        .rsvps
        .submit(RsvpRequest::new(guest.id, RsvpStatus::Attending))
        .await
        .unwrap();

    // Draining the queue makes the fire-and-forget send observable.
    harness.notifier.close().await;

    let sent = Tags::with("type", "rsvp_confirmation");
    assert_eq!(harness.registry.counter_value("email.sent", &sent), 1);
}

#[tokio::test]
async fn weather_error_rate_and_timer_cardinality_hold_over_many_calls() {
    let registry = Arc::new(MetricRegistry::new());
    let api = ExternalApi::new(
        registry.clone(),
        Simulator::instant(Arc::new(SeededFaults::new(7))),
        ExternalConfig::default(),
    );

    let calls = 1000u64;
    let mut failures = 0u64;
    for _ in 0..calls {
        if api.weather("2025-09-20").await.is_err() {
            failures += 1;
        }
    }

    // Configured odds are 1 in 10; allow sampling noise.
    assert!((60..=150).contains(&failures), "observed {failures} failures");

    let weather = Tags::with("provider", "weather");
    let ok = weather.clone().and("result", "success");
    let err = weather.clone().and("result", "error");
    assert_eq!(registry.counter_value("external.calls", &ok), calls - failures);
    assert_eq!(registry.counter_value("external.calls", &err), failures);
    assert_eq!(registry.timer_count("external.duration", &weather), calls);
}

#[tokio::test]
async fn simulated_database_error_is_counted_then_raised() {
    let harness = Harness::new();
    let err = harness.guests.simulate_database_error().await.unwrap_err();
    assert!(err.is_simulated_fault());

    let tags = Tags::with("type", "database").and("endpoint", "guests");
    assert_eq!(harness.registry.counter_value("errors", &tags), 1);
}
