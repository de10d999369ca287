//! Prometheus metrics for Adgate
//!
//! Exposed at `/metrics` when `metrics.enabled` is set.

use adgate_core::{Error, Result};
use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::server::AppState;

/// Metric names
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "adgate_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "adgate_http_request_duration_seconds";
    pub const AUTH_REJECTIONS_TOTAL: &str = "adgate_auth_rejections_total";
    pub const DIRECTORY_FAILURES_TOTAL: &str = "adgate_directory_failures_total";
    pub const UPTIME_SECONDS: &str = "adgate_uptime_seconds";
    pub const INFO: &str = "adgate_info";
}

/// Metrics recorder
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
    start_time: Instant,
}

impl MetricsRecorder {
    /// Install the process-wide Prometheus recorder
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| Error::InternalError(format!("Failed to install Prometheus recorder: {}", e)))?;

        gauge!(names::INFO, "version" => adgate_core::VERSION).set(1.0);

        Ok(Self {
            handle,
            start_time: Instant::now(),
        })
    }

    /// Metrics output in Prometheus text format
    pub fn render(&self) -> String {
        gauge!(names::UPTIME_SECONDS).set(self.start_time.elapsed().as_secs_f64());
        self.handle.render()
    }

    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        counter!(
            names::HTTP_REQUESTS_TOTAL,
            "method" => method.to_string(),
            "route" => route.to_string(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            names::HTTP_REQUEST_DURATION_SECONDS,
            "method" => method.to_string(),
            "route" => route.to_string()
        )
        .record(duration_secs);
    }
}

/// Axum middleware for recording HTTP metrics
pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRecorder>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();
    metrics.record_http_request(&method, &route, status, duration);

    debug!(
        method = %method,
        route = %route,
        status = %status,
        duration_ms = %(duration * 1000.0),
        "Request completed"
    );

    response
}

/// Handler for /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(metrics) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            metrics.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
