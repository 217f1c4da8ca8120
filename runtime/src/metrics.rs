//! Registration metrics and their Prometheus exporter.
//!
//! Counters cover sign-up outcomes, rejections, withdrawals, promotions,
//! ledger conflicts and failed notifications. Append latency is a histogram.
//! Without an installed recorder every `record_*` call is a no-op, so tests
//! and embedded uses need no setup.
//!
//! ```rust,no_run
//! use signup_ledger_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsServer::new("0.0.0.0:9090".parse()?);
//! exporter.start()?;
//! // GET http://0.0.0.0:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Append latencies are milliseconds in the common case.
const APPEND_BUCKETS: &[f64] = &[0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

/// The exporter could not be set up.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Invalid exporter configuration
    #[error("Invalid metrics exporter configuration: {0}")]
    Build(String),
    /// A global recorder is already installed
    #[error("Metrics recorder already installed: {0}")]
    Install(String),
}

/// Serves `/metrics` for Prometheus.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Exporter that will listen on `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the global recorder and start listening.
    ///
    /// Needs a running Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter is misconfigured or another
    /// recorder is already installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let build_error = |e: metrics_exporter_prometheus::BuildError| MetricsError::Build(e.to_string());

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Full("ledger_append_duration_seconds".to_string()),
                APPEND_BUCKETS,
            )
            .map_err(build_error)?
            .build()
            .map_err(build_error)?;

        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| MetricsError::Install(e.to_string()))?;
        register_metrics();

        let addr = self.addr;
        tokio::spawn(async move {
            if exporter.await.is_err() {
                tracing::error!(%addr, "Metrics exporter stopped");
            }
        });

        self.handle = Some(handle);
        Ok(())
    }

    /// Current metrics in text exposition format, once started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "registrations_admitted_total",
        "Sign-ups appended to the ledger, labelled by outcome (signup or waitlist)"
    );
    describe_counter!(
        "registrations_rejected_total",
        "Sign-ups rejected before any ledger mutation, labelled by reason"
    );
    describe_counter!("withdrawals_total", "Dropouts appended to the ledger");
    describe_counter!(
        "promotions_total",
        "Waitlisted users moved into a freed seat"
    );
    describe_counter!(
        "ledger_conflicts_total",
        "Conditional appends rejected because another writer moved the event head"
    );
    describe_counter!(
        "notifications_failed_total",
        "Notifications that failed or timed out, labelled by kind"
    );
    describe_histogram!(
        "ledger_append_duration_seconds",
        "Time taken by a ledger append, labelled by action"
    );
}

/// Registration metrics recorder.
pub struct RegistrationMetrics;

impl RegistrationMetrics {
    /// Record an admitted sign-up (`signup` or `waitlist`).
    pub fn record_admitted(outcome: &'static str) {
        counter!("registrations_admitted_total", "outcome" => outcome).increment(1);
    }

    /// Record a rejected sign-up or withdrawal.
    pub fn record_rejected(reason: &'static str) {
        counter!("registrations_rejected_total", "reason" => reason).increment(1);
    }

    /// Record a withdrawal.
    pub fn record_withdrawal() {
        counter!("withdrawals_total").increment(1);
    }

    /// Record a promotion.
    pub fn record_promotion() {
        counter!("promotions_total").increment(1);
    }
}

/// Ledger metrics recorder.
pub struct LedgerMetrics;

impl LedgerMetrics {
    /// Record an append and how long it took.
    pub fn record_append(action: &'static str, duration: Duration) {
        histogram!("ledger_append_duration_seconds", "action" => action)
            .record(duration.as_secs_f64());
    }

    /// Record a concurrency conflict.
    pub fn record_conflict() {
        counter!("ledger_conflicts_total").increment(1);
    }
}

/// Notification metrics recorder.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record a failed or timed-out notification.
    pub fn record_failure(kind: &'static str) {
        counter!("notifications_failed_total", "kind" => kind).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn unstarted_exporter_renders_nothing() {
        let server = MetricsServer::new(SocketAddr::from(([127, 0, 0, 1], 0)));
        assert!(server.render().is_none());
    }

    #[test]
    fn recorders_emit_named_series() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            RegistrationMetrics::record_admitted("waitlist");
            RegistrationMetrics::record_rejected("duplicate_priority");
            RegistrationMetrics::record_promotion();
            LedgerMetrics::record_conflict();
            NotificationMetrics::record_failure("promoted");
        });

        let rendered = handle.render();
        assert!(rendered.contains("registrations_admitted_total{outcome=\"waitlist\"} 1"));
        assert!(rendered.contains("registrations_rejected_total{reason=\"duplicate_priority\"} 1"));
        assert!(rendered.contains("promotions_total 1"));
        assert!(rendered.contains("ledger_conflicts_total 1"));
        assert!(rendered.contains("notifications_failed_total{kind=\"promoted\"} 1"));
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        RegistrationMetrics::record_withdrawal();
        LedgerMetrics::record_append("signup", Duration::from_millis(3));
    }
}
