use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::warn;

/// The global recorder can be installed only once per process.
static HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install (or reuse) the process-wide Prometheus recorder.
    /// `None` when another recorder already owns the global slot.
    pub fn init() -> Option<Self> {
        let handle = HANDLE
            .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
                Ok(h) => {
                    describe_all();
                    Some(h)
                }
                Err(e) => {
                    warn!(error = %e, "prometheus recorder not installed");
                    None
                }
            })
            .clone()?;
        Some(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_all() {
    describe_counter!("validation_requests_total", "Validation runs started");
    describe_counter!(
        "validation_failures_total",
        "Validation runs that ended in a typed error, by kind"
    );
    describe_counter!(
        "signal_provider_attempts_total",
        "Outbound provider attempts including retries"
    );
    describe_counter!(
        "signal_provider_errors_total",
        "Provider calls that ended failed or timed out"
    );
    describe_counter!(
        "analysis_quality_warnings_total",
        "Data-quality findings on accepted analyses"
    );
    describe_histogram!(
        "validation_duration_ms",
        Unit::Milliseconds,
        "Wall time of one validation run"
    );
    describe_histogram!(
        "model_request_duration_ms",
        Unit::Milliseconds,
        "Wall time of the model request"
    );
}
