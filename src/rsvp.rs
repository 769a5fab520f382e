//! RSVP submission, lookup, and statistics.
//!
//! Submission enforces at most one RSVP per guest (fast-fail here, final
//! authority in the store) and hands the confirmation notification to the
//! dispatcher after the synchronous result is ready: the submitter's response
//! never depends on the notification outcome.

use serde::Serialize;
use std::sync::Arc;

use crate::config::RsvpConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::model::{Rsvp, RsvpRequest, RsvpStatus};
use crate::notify::NotificationQueue;
use crate::simulate::Simulator;
use crate::store::RsvpStore;
use crate::telemetry::{MetricSink, Tags};

/// Aggregated RSVP statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsvpStats {
    pub total: u64,
    pub attending: u64,
    pub not_attending: u64,
    pub maybe: u64,
    pub plus_one_attending: u64,
    /// `attending / total * 100`; zero when no RSVPs exist.
    pub attendance_rate: f64,
}

/// Service over RSVP submissions.
pub struct RsvpService {
    store: Arc<dyn RsvpStore>,
    metrics: Arc<dyn MetricSink>,
    simulator: Simulator,
    notifier: Arc<NotificationQueue>,
    config: RsvpConfig,
}

impl RsvpService {
    pub fn new(
        store: Arc<dyn RsvpStore>,
        metrics: Arc<dyn MetricSink>,
        simulator: Simulator,
        notifier: Arc<NotificationQueue>,
        config: RsvpConfig,
    ) -> Self {
        Self { store, metrics, simulator, notifier, config }
    }

    /// Persist a new RSVP and schedule its confirmation notification.
    pub async fn submit(&self, request: RsvpRequest) -> ServiceResult<Rsvp> {
        self.simulator.delay(self.config.submit_delay).await;

        if self.store.find_by_guest(request.guest_id).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "RSVP already exists for guest ID: {}",
                request.guest_id
            )));
        }

        let rsvp = self.store.insert(request).await?;
        self.metrics
            .increment("rsvp.submitted", &Tags::with("status", rsvp.status.as_str()));

        // Fire and forget; the confirmation outcome is telemetry-only.
        self.notifier.submit(rsvp.clone()).await;
        Ok(rsvp)
    }

    /// The RSVP submitted for `guest_id`, or `NotFound`.
    pub async fn get_by_guest_id(&self, guest_id: u64) -> ServiceResult<Rsvp> {
        self.store
            .find_by_guest(guest_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("rsvp", guest_id))
    }

    /// Aggregate counts and the attendance rate, publishing gauges as a side
    /// effect.
    pub async fn calculate_stats(&self) -> ServiceResult<RsvpStats> {
        self.simulator.delay(self.config.stats_delay).await;

        let total = self.store.count().await?;
        let attending = self.store.count_by_status(RsvpStatus::Attending).await?;
        let not_attending = self.store.count_by_status(RsvpStatus::NotAttending).await?;
        let maybe = self.store.count_by_status(RsvpStatus::Maybe).await?;
        let plus_one_attending = self.store.count_plus_one_attending().await?;

        let attendance_rate =
            if total > 0 { attending as f64 / total as f64 * 100.0 } else { 0.0 };

        self.metrics.set_gauge("rsvp.total", &Tags::new(), total as f64);
        self.metrics.set_gauge("rsvp.attending", &Tags::new(), attending as f64);
        self.metrics.set_gauge("rsvp.attendance_rate", &Tags::new(), attendance_rate);

        Ok(RsvpStats { total, attending, not_attending, maybe, plus_one_attending, attendance_rate })
    }

    /// All RSVPs carrying the given status.
    pub async fn list_by_status(&self, status: RsvpStatus) -> ServiceResult<Vec<Rsvp>> {
        self.store.list_by_status(status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotifyConfig;
    use crate::simulate::ScriptedFaults;
    use crate::store::InMemoryRsvpStore;
    use crate::telemetry::MetricRegistry;

    fn service() -> (RsvpService, Arc<MetricRegistry>, Arc<NotificationQueue>) {
        let registry = Arc::new(MetricRegistry::new());
        let simulator = Simulator::instant(Arc::new(ScriptedFaults::none()));
        let notifier = Arc::new(NotificationQueue::new(
            NotifyConfig::default(),
            RsvpConfig::default(),
            simulator.clone(),
            registry.clone(),
        ));
        let service = RsvpService::new(
            Arc::new(InMemoryRsvpStore::new()),
            registry.clone(),
            simulator,
            notifier.clone(),
            RsvpConfig::default(),
        );
        (service, registry, notifier)
    }

    #[tokio::test]
    async fn submit_persists_and_counts_by_status() {
        let (service, registry, _) = service();
        let rsvp = service.submit(RsvpRequest::new(1, RsvpStatus::Attending)).await.unwrap();
        assert_eq!(rsvp.guest_id, 1);

        let tags = Tags::with("status", "attending");
        assert_eq!(registry.counter_value("rsvp.submitted", &tags), 1);
    }

    #[tokio::test]
    async fn second_submission_for_guest_conflicts() {
        let (service, _, _) = service();
        service.submit(RsvpRequest::new(1, RsvpStatus::Attending)).await.unwrap();
        let err = service.submit(RsvpRequest::new(1, RsvpStatus::Maybe)).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("guest ID: 1"));
    }

    #[tokio::test]
    async fn submit_schedules_confirmation() {
        let (service, registry, notifier) = service();
        service.submit(RsvpRequest::new(1, RsvpStatus::Attending)).await.unwrap();
        notifier.close().await;

        let tags = Tags::with("type", "rsvp_confirmation");
        assert_eq!(registry.counter_value("email.sent", &tags), 1);
    }

    #[tokio::test]
    async fn get_by_guest_id_round_trips() {
        let (service, _, _) = service();
        let submitted = service.submit(RsvpRequest::new(7, RsvpStatus::Maybe)).await.unwrap();
        let fetched = service.get_by_guest_id(7).await.unwrap();
        assert_eq!(fetched, submitted);

        let err = service.get_by_guest_id(8).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn stats_add_up_and_publish_gauges() {
        let (service, registry, _) = service();
        service.submit(RsvpRequest::new(1, RsvpStatus::Attending)).await.unwrap();
        service.submit(RsvpRequest::new(2, RsvpStatus::Attending)).await.unwrap();
        service.submit(RsvpRequest::new(3, RsvpStatus::NotAttending)).await.unwrap();
        service.submit(RsvpRequest::new(4, RsvpStatus::Maybe)).await.unwrap();

        let stats = service.calculate_stats().await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.attending, 2);
        assert_eq!(stats.not_attending, 1);
        assert_eq!(stats.maybe, 1);
        assert_eq!(stats.attending + stats.not_attending + stats.maybe, stats.total);
        assert_eq!(stats.attendance_rate, 50.0);

        assert_eq!(registry.gauge_value("rsvp.total", &Tags::new()), Some(4.0));
        assert_eq!(registry.gauge_value("rsvp.attending", &Tags::new()), Some(2.0));
        assert_eq!(registry.gauge_value("rsvp.attendance_rate", &Tags::new()), Some(50.0));
    }

    #[tokio::test]
    async fn stats_on_empty_store_guard_division() {
        let (service, _, _) = service();
        let stats = service.calculate_stats().await.unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.attendance_rate, 0.0);
    }

    #[tokio::test]
    async fn list_by_status_filters() {
        let (service, _, _) = service();
        service.submit(RsvpRequest::new(1, RsvpStatus::Attending)).await.unwrap();
        service.submit(RsvpRequest::new(2, RsvpStatus::Maybe)).await.unwrap();

        let maybes = service.list_by_status(RsvpStatus::Maybe).await.unwrap();
        assert_eq!(maybes.len(), 1);
        assert_eq!(maybes[0].guest_id, 2);
    }
}
