//! Response shaping.
//!
//! # Responsibilities
//! - Turn a buffered backend response into a client response
//! - Map breaker outcomes to HTTP status codes
//!
//! # Design Decisions
//! - Backend status and JSON body are forwarded unchanged
//! - Backend timeouts result in 504 Gateway Timeout
//! - Short-circuited calls result in 503 with the fallback payload

use axum::{
    response::{IntoResponse, Response},
    Json,
};

use crate::resilience::CallOutcome;
use crate::upstream::{ServiceName, UpstreamResponse};

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Pass-through rendering of a single-backend outcome.
pub fn outcome_response(service: ServiceName, outcome: CallOutcome) -> Response {
    match outcome.into_result(service) {
        Ok(response) => response.into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_created_status_is_kept() {
        let response = outcome_response(
            ServiceName::Article,
            CallOutcome::Success(UpstreamResponse::new(
                StatusCode::CREATED,
                json!({ "success": true }),
            )),
        );
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_outcome_statuses() {
        let timeout = outcome_response(ServiceName::Article, CallOutcome::Timeout);
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let rejected = outcome_response(
            ServiceName::Comment,
            CallOutcome::Rejected(json!({ "fallback": true })),
        );
        assert_eq!(rejected.status(), StatusCode::SERVICE_UNAVAILABLE);

        let failed = outcome_response(
            ServiceName::Article,
            CallOutcome::Failure(UpstreamResponse::new(StatusCode::NOT_FOUND, json!({}))),
        );
        assert_eq!(failed.status(), StatusCode::NOT_FOUND);
    }
}
