//! On-demand backend health probing.
//!
//! # Responsibilities
//! - Answer the gateway liveness endpoint
//! - Fetch each backend's own `/health` document, bypassing the breakers
//! - Report breaker states alongside, without changing them
//!
//! # Design Decisions
//! - Backends are probed concurrently, each with its own short timeout
//! - The gateway reports itself OK even when a backend is down; the backend
//!   entry carries the error instead

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::http::AppState;
use crate::resilience::CircuitState;
use crate::upstream::{BackendDescriptor, ServiceName, UpstreamClient};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayHealth {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
    pub circuit_breakers: BTreeMap<ServiceName, CircuitState>,
    pub services: BTreeMap<ServiceName, Value>,
}

pub async fn gateway_health(State(state): State<AppState>) -> Json<GatewayHealth> {
    let dispatcher = &state.dispatcher;
    let backends = dispatcher.backends();
    let client = dispatcher.upstream();

    let (article, comment) = tokio::join!(
        probe(client, backends.get(ServiceName::Article), state.health_timeout),
        probe(client, backends.get(ServiceName::Comment), state.health_timeout),
    );

    let circuit_breakers = dispatcher
        .registry()
        .iter()
        .map(|breaker| (breaker.service(), breaker.state()))
        .collect();

    Json(GatewayHealth {
        status: "OK",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        service: "api-gateway",
        circuit_breakers,
        services: BTreeMap::from([
            (ServiceName::Article, article),
            (ServiceName::Comment, comment),
        ]),
    })
}

async fn probe(client: &UpstreamClient, backend: &BackendDescriptor, timeout: Duration) -> Value {
    match client.get_health(backend, timeout).await {
        Ok(body) => body,
        Err(error) => {
            tracing::warn!(service = %backend.service, error = %error, "Backend health probe failed");
            json!({ "status": "ERROR", "error": error })
        }
    }
}
