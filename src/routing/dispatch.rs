//! Breaker-guarded dispatch to a backend.
//!
//! # Responsibilities
//! - Pair each service's breaker with its descriptor and the shared client
//! - Run one upstream call through the right breaker
//! - Record upstream metrics for every outcome
//!
//! # Design Decisions
//! - The dispatcher owns the registry; handlers never reach a breaker any
//!   other way
//! - The request body is already buffered, so the upstream future owns
//!   everything it needs and can outlive the handler

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::Method;

use crate::error::GatewayError;
use crate::observability::metrics;
use crate::resilience::{BreakerRegistry, CallOutcome};
use crate::upstream::{Backends, ServiceName, UpstreamClient};

pub struct Dispatcher {
    registry: Arc<BreakerRegistry>,
    backends: Backends,
    upstream: UpstreamClient,
}

impl Dispatcher {
    pub fn new(registry: Arc<BreakerRegistry>, backends: Backends, upstream: UpstreamClient) -> Self {
        Self {
            registry,
            backends,
            upstream,
        }
    }

    /// Call `path` on `service` through its circuit breaker.
    ///
    /// `path` must already be percent-encoded. A request that cannot be
    /// built is an internal error and never reaches the breaker.
    pub async fn call(
        &self,
        service: ServiceName,
        method: Method,
        path: String,
        body: Option<Bytes>,
        request_id: Option<String>,
    ) -> Result<CallOutcome, GatewayError> {
        let start = Instant::now();
        let backend = self.backends.get(service).clone();
        let request =
            UpstreamClient::build_request(&backend, method, &path, body, request_id.as_deref())
                .map_err(|e| {
                    GatewayError::Internal(format!(
                        "cannot build request for {}{}: {}",
                        service, path, e
                    ))
                })?;

        let breaker = self.registry.get(service);
        let upstream = self.upstream.clone();
        let outcome = breaker
            .execute(move || async move { upstream.send(&backend, request).await })
            .await;

        tracing::debug!(service = %service, outcome = outcome.label(), "Upstream call finished");
        metrics::record_upstream_call(service, &outcome, start);
        Ok(outcome)
    }

    pub fn registry(&self) -> &Arc<BreakerRegistry> {
        &self.registry
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }
}
