//! Observability utilities for control-plane clients.
//!
//! This crate provides:
//! - Prometheus metrics recorder installation
//! - Descriptions for the gRPC client call metrics
//! - Text exposition rendering for CLIs and scrape endpoints
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, render_metrics};
//!
//! // Initialize metrics recorder
//! init_metrics()?;
//!
//! // ... issue calls through grpc-client ...
//!
//! println!("{}", render_metrics());
//! ```

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup; later calls return the
/// handle installed by the first one.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;

        info!("Prometheus metrics recorder initialized");

        // Register metric descriptions
        register_metric_descriptions();

        Ok(handle)
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Render the Prometheus text exposition
pub fn render_metrics() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_histogram, Unit};

    // gRPC client metrics, one sample per physical attempt
    describe_counter!(
        "grpc_client_requests_total",
        "Total gRPC client call attempts by destination, method and status"
    );
    describe_histogram!(
        "grpc_client_request_duration_seconds",
        Unit::Seconds,
        "gRPC client call attempt duration in seconds"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent_and_renders_samples() {
        let first = init_metrics().unwrap() as *const PrometheusHandle;
        let second = init_metrics().unwrap() as *const PrometheusHandle;
        assert_eq!(first, second);

        metrics::counter!("grpc_client_requests_total", "method" => "FindJob").increment(1);

        let rendered = render_metrics();
        assert!(rendered.contains("grpc_client_requests_total"));
        assert!(rendered.contains("method=\"FindJob\""));
    }
}
