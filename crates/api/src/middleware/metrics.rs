//! Prometheus metrics middleware.
//!
//! Provides HTTP request/response metrics collection and export, plus the
//! delivery counters recorded by the webhook engine.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, histogram};
use std::sync::OnceLock;
use std::time::Instant;

/// Middleware to record HTTP request metrics.
///
/// Records the following metrics:
/// - `http_requests_total`: Counter with labels (method, path, status)
/// - `http_request_duration_seconds`: Histogram with labels (method, path)
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    let method_str = method_to_str(&method);

    counter!(
        "http_requests_total",
        "method" => method_str.to_string(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method_str.to_string(),
        "path" => path
    )
    .record(duration);

    response
}

/// Convert HTTP method to string for metric labels.
fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

/// Record one outbound delivery attempt.
///
/// `outcome` is the [`DeliveryOutcome`](domain::models::DeliveryOutcome) label.
pub fn record_delivery_attempt(outcome: &'static str, duration_secs: f64) {
    counter!("webhook_delivery_attempts_total", "outcome" => outcome).increment(1);
    histogram!("webhook_delivery_duration_seconds", "outcome" => outcome).record(duration_secs);
}

pub fn record_retry_scheduled() {
    counter!("webhook_retries_scheduled_total").increment(1);
}

pub fn record_dead_letter() {
    counter!("webhook_dead_letters_total").increment(1);
}

/// Handler for /metrics endpoint that returns Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        let output = handle.render();
        (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            output,
        )
    } else {
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        )
    }
}

static PROMETHEUS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Errors raised while installing the Prometheus recorder.
#[derive(Debug, thiserror::Error)]
pub enum MetricsInitError {
    #[error("Failed to build Prometheus recorder: {0}")]
    Build(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Prometheus recorder already initialized")]
    AlreadyInitialized,
}

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once during application startup before any metrics are recorded.
pub fn init_metrics() -> Result<(), MetricsInitError> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    // Buckets cover both fast API calls and slow subscriber endpoints.
    let handle = PrometheusBuilder::new()
        .set_buckets(&[
            0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0,
        ])?
        .install_recorder()?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsInitError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_to_str() {
        assert_eq!(method_to_str(&Method::GET), "GET");
        assert_eq!(method_to_str(&Method::POST), "POST");
        assert_eq!(method_to_str(&Method::DELETE), "DELETE");
        assert_eq!(method_to_str(&Method::PATCH), "PATCH");
    }

    #[test]
    fn test_method_to_str_other() {
        assert_eq!(method_to_str(&Method::TRACE), "OTHER");
    }

    #[test]
    fn test_delivery_metrics_without_recorder() {
        // No recorder installed: recording must be a silent no-op.
        record_delivery_attempt("success", 0.2);
        record_retry_scheduled();
        record_dead_letter();
    }
}
