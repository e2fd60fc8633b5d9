//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, upstream outcomes, breaker state)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-backend and aggregate metrics
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by method, status
//! - `gateway_request_duration_seconds` (histogram): inbound latency
//! - `gateway_upstream_calls_total` (counter): breaker outcomes by service
//! - `gateway_upstream_duration_seconds` (histogram): upstream latency by service
//! - `gateway_breaker_transitions_total` (counter): state changes by service, target state
//! - `gateway_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `gateway_fallbacks_total` (counter): short-circuited calls by service
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels are low-cardinality: no paths, no IDs

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::{BreakerEvent, CallOutcome, CircuitState};
use crate::upstream::ServiceName;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Axum middleware counting every inbound request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = next.run(request).await;

    record_request(&method, response.status().as_u16(), start);
    response
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    ::metrics::counter!("gateway_requests_total", &labels).increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_call(service: ServiceName, outcome: &CallOutcome, start: Instant) {
    let labels = [
        ("service", service.as_str().to_string()),
        ("outcome", outcome.label().to_string()),
    ];
    ::metrics::counter!("gateway_upstream_calls_total", &labels).increment(1);
    if !matches!(outcome, CallOutcome::Rejected(_)) {
        ::metrics::histogram!("gateway_upstream_duration_seconds", "service" => service.as_str())
            .record(start.elapsed().as_secs_f64());
    }
}

pub fn record_breaker_event(event: &BreakerEvent) {
    match event {
        BreakerEvent::StateChanged { service, to, .. } => {
            ::metrics::counter!(
                "gateway_breaker_transitions_total",
                "service" => service.as_str(),
                "to" => to.as_str()
            )
            .increment(1);
            ::metrics::gauge!("gateway_breaker_state", "service" => service.as_str())
                .set(state_value(*to));
        }
        BreakerEvent::Fallback { service } => {
            ::metrics::counter!("gateway_fallbacks_total", "service" => service.as_str())
                .increment(1);
        }
    }
}

fn state_value(state: CircuitState) -> f64 {
    match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    }
}
