//! Prometheus metrics setup and metric definitions

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    // Prometheus defaults plus a sub-millisecond bucket for cached lookups
    let buckets = [
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions so HELP/TYPE lines are present from startup.
pub fn describe_metrics() {
    describe_counter!(
        "oauth2_admin_http_requests_total",
        "Total number of admin API requests"
    );
    describe_histogram!(
        "oauth2_admin_http_request_duration_seconds",
        "Admin API request duration in seconds"
    );
    describe_gauge!(
        "oauth2_admin_http_requests_in_flight",
        "Number of admin API requests currently being processed"
    );
    describe_counter!(
        "oauth2_admin_access_denied_total",
        "Authorization denials by resource kind and reason"
    );

    gauge!("oauth2_admin_http_requests_in_flight").set(0.0);
    counter!(
        "oauth2_admin_access_denied_total",
        "kind" => "application",
        "reason" => "missing_scope"
    )
    .absolute(0);
}
