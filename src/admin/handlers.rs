use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method},
    Json,
};
use serde::Serialize;

use crate::error::GatewayError;
use crate::http::request::request_id;
use crate::http::AppState;
use crate::resilience::{BreakerSnapshot, CircuitState};
use crate::upstream::ServiceName;

/// Path no backend serves; the synthetic test call always fails.
const TEST_PATH: &str = "/non-existent-endpoint";

#[derive(Debug, Serialize)]
pub struct TestResult {
    pub message: String,
    pub outcome: &'static str,
    pub state: CircuitState,
}

#[derive(Debug, Serialize)]
pub struct ResetResult {
    pub message: String,
    pub state: CircuitState,
}

pub async fn get_status(
    State(state): State<AppState>,
) -> Json<BTreeMap<ServiceName, BreakerSnapshot>> {
    Json(state.dispatcher.registry().snapshot_all())
}

/// Push one failing call through the named breaker.
pub async fn test_breaker(
    State(state): State<AppState>,
    Path(service): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TestResult>, GatewayError> {
    let service = state.dispatcher.registry().lookup(&service)?.service();

    let outcome = state
        .dispatcher
        .call(
            service,
            Method::GET,
            TEST_PATH.to_string(),
            None,
            request_id(&headers),
        )
        .await?;
    let breaker_state = state.dispatcher.registry().get(service).state();

    tracing::info!(
        service = %service,
        outcome = outcome.label(),
        state = %breaker_state,
        "Circuit breaker test call"
    );

    Ok(Json(TestResult {
        message: format!("Test call sent to {}", service),
        outcome: outcome.label(),
        state: breaker_state,
    }))
}

pub async fn reset_breaker(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<Json<ResetResult>, GatewayError> {
    let service = service.parse::<ServiceName>()?;
    let new_state = state.dispatcher.registry().force_close(service);

    Ok(Json(ResetResult {
        message: format!("Circuit breaker for {} reset", service),
        state: new_state,
    }))
}
