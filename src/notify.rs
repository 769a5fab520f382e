//! Fire-and-forget confirmation notifications.
//!
//! Submissions flow into a bounded channel drained by one background worker
//! (spawned at construction, so the queue must be created inside a tokio
//! runtime). The submitter never observes the outcome: a confirmation that
//! fails is a warning plus a counter, nothing more. When the queue saturates,
//! submission blocks until capacity frees up rather than growing without
//! bound.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{NotifyConfig, RsvpConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::model::Rsvp;
use crate::simulate::Simulator;
use crate::telemetry::{MetricSink, Tags};

/// Bounded queue plus worker for confirmation notifications.
pub struct NotificationQueue {
    tx: Mutex<Option<mpsc::Sender<Rsvp>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<dyn MetricSink>,
}

impl NotificationQueue {
    /// Spawn the worker and return a handle for submissions.
    pub fn new(
        config: NotifyConfig,
        rsvp_config: RsvpConfig,
        simulator: Simulator,
        metrics: Arc<dyn MetricSink>,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<Rsvp>(config.queue_capacity.max(1));
        let worker_metrics = metrics.clone();
        let worker = tokio::spawn(async move {
            debug!("notification worker started");
            while let Some(rsvp) = rx.recv().await {
                match send_confirmation(&rsvp, &rsvp_config, &simulator, &worker_metrics).await {
                    Ok(()) => {}
                    Err(err) => {
                        // Telemetry-only failure; the submitter has long since
                        // received its response.
                        warn!(rsvp_id = rsvp.id, error = %err, "confirmation failed");
                        worker_metrics
                            .increment("email.failed", &Tags::with("type", "rsvp_confirmation"));
                    }
                }
            }
            debug!("notification worker stopped");
        });
        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            metrics,
        }
    }

    /// Enqueue a confirmation for `rsvp`. Blocks only when the queue is
    /// saturated; never returns the notification outcome.
    pub async fn submit(&self, rsvp: Rsvp) {
        let tx = {
            let guard = self.tx.lock().expect("notification queue poisoned");
            guard.clone()
        };
        match tx {
            Some(tx) => {
                if tx.send(rsvp).await.is_err() {
                    warn!("notification dropped: worker gone");
                    self.metrics.increment("notify.dropped", &Tags::new());
                }
            }
            None => {
                warn!("notification dropped: queue closed");
                self.metrics.increment("notify.dropped", &Tags::new());
            }
        }
    }

    /// Stop accepting submissions and wait for the worker to drain the queue.
    pub async fn close(&self) {
        {
            let mut guard = self.tx.lock().expect("notification queue poisoned");
            guard.take();
        }
        let handle = {
            let mut guard = self.worker.lock().expect("notification queue poisoned");
            guard.take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// The confirmation job itself: simulated send latency, then the counter.
async fn send_confirmation(
    rsvp: &Rsvp,
    config: &RsvpConfig,
    simulator: &Simulator,
    metrics: &Arc<dyn MetricSink>,
) -> ServiceResult<()> {
    simulator.delay(config.confirmation_delay).await;
    if simulator.should_fail(config.confirmation_failure_one_in) {
        return Err(ServiceError::ExternalUnavailable(
            "confirmation email provider unavailable".into(),
        ));
    }
    debug!(rsvp_id = rsvp.id, guest_id = rsvp.guest_id, "confirmation sent");
    metrics.increment("email.sent", &Tags::with("type", "rsvp_confirmation"));
    Ok(())
}
