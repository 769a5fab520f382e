//! Simulated external weather/maps collaborators.
//!
//! No network is involved: each lookup is randomized latency, a probabilistic
//! failure roll, and synthesized payload fields. Telemetry discipline is the
//! contract here: every call records exactly one duration sample plus a
//! success or error counter, whichever way it went, so the instrumentation
//! pipeline sees the same shape as a real integration.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ExternalConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::simulate::Simulator;
use crate::telemetry::{MetricSink, Tags};

const WEATHER_CONDITIONS: [&str; 6] =
    ["Sunny", "Partly Cloudy", "Cloudy", "Light Rain", "Clear", "Overcast"];
const TRAFFIC_CONDITIONS: [&str; 4] =
    ["Light Traffic", "Moderate Traffic", "Heavy Traffic", "Clear Roads"];
const VENUE_ADDRESS: &str = "Beautiful Gardens, 123 Garden Lane, City, State";

/// Synthesized weather attributes for a date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub date: String,
    pub temperature_f: u32,
    pub condition: &'static str,
    pub humidity_pct: u32,
    pub wind_mph: u32,
    pub precipitation_pct: u32,
    pub observed_at: DateTime<Utc>,
    pub source: &'static str,
}

/// Synthesized route attributes from an origin to the venue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionsReport {
    pub origin: String,
    pub destination: &'static str,
    pub distance_miles: f64,
    pub duration_minutes: u32,
    pub route: &'static str,
    pub traffic: &'static str,
    pub retrieved_at: DateTime<Utc>,
    pub source: &'static str,
}

/// Simulated weather/maps provider.
pub struct ExternalApi {
    metrics: Arc<dyn MetricSink>,
    simulator: Simulator,
    config: ExternalConfig,
}

impl ExternalApi {
    pub fn new(metrics: Arc<dyn MetricSink>, simulator: Simulator, config: ExternalConfig) -> Self {
        Self { metrics, simulator, config }
    }

    /// Weather lookup: 500–2000 ms of latency, roughly one failure in ten.
    pub async fn weather(&self, date: &str) -> ServiceResult<WeatherReport> {
        let started = Instant::now();
        self.simulator.delay(self.config.weather_delay).await;

        let outcome = if self.simulator.should_fail(self.config.weather_failure_one_in) {
            Err(ServiceError::ExternalUnavailable(
                "weather service temporarily unavailable".into(),
            ))
        } else {
            let mut rng = rand::rng();
            Ok(WeatherReport {
                date: date.to_string(),
                temperature_f: rng.random_range(72..92),
                condition: WEATHER_CONDITIONS[rng.random_range(0..WEATHER_CONDITIONS.len())],
                humidity_pct: rng.random_range(40..80),
                wind_mph: rng.random_range(5..20),
                precipitation_pct: rng.random_range(0..20),
                observed_at: Utc::now(),
                source: "simulated-weather",
            })
        };

        self.record_call("weather", outcome.is_ok(), started.elapsed());
        outcome
    }

    /// Directions lookup: 300–1500 ms of latency, roughly one failure in
    /// fifteen.
    pub async fn directions(&self, origin: &str) -> ServiceResult<DirectionsReport> {
        let started = Instant::now();
        self.simulator.delay(self.config.directions_delay).await;

        let outcome = if self.simulator.should_fail(self.config.directions_failure_one_in) {
            Err(ServiceError::ExternalUnavailable("maps service rate limit exceeded".into()))
        } else {
            let mut rng = rand::rng();
            Ok(DirectionsReport {
                origin: origin.to_string(),
                destination: VENUE_ADDRESS,
                distance_miles: (rng.random_range(50..250) as f64) / 10.0,
                duration_minutes: rng.random_range(15..60),
                route: "Take Main St to Garden Lane, turn right",
                traffic: TRAFFIC_CONDITIONS[rng.random_range(0..TRAFFIC_CONDITIONS.len())],
                retrieved_at: Utc::now(),
                source: "simulated-maps",
            })
        };

        self.record_call("maps", outcome.is_ok(), started.elapsed());
        outcome
    }

    /// Always blocks for the configured hard duration, then fails. Produces a
    /// trace with a long flat span ending in an error.
    pub async fn simulate_timeout(&self) -> ServiceResult<()> {
        let started = Instant::now();
        self.simulator.delay_exact(self.config.timeout_duration).await;
        self.record_call("timeout", false, started.elapsed());
        Err(ServiceError::ExternalUnavailable("external call timed out (simulated)".into()))
    }

    fn record_call(&self, provider: &str, success: bool, elapsed: std::time::Duration) {
        let result = if success { "success" } else { "error" };
        self.metrics.increment(
            "external.calls",
            &Tags::with("provider", provider.to_string()).and("result", result),
        );
        self.metrics.record_duration(
            "external.duration",
            &Tags::with("provider", provider.to_string()),
            elapsed,
        );
    }
}
