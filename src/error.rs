//! Gateway error type and its HTTP rendering.
//!
//! Every variant maps to exactly one response shape:
//! - `UpstreamFailure`: backend status and body forwarded verbatim
//! - `UpstreamTimeout`: 504 with `timeout: true`
//! - `CircuitOpen`: 503 with the breaker's fallback payload
//! - `UnknownService` / `RouteNotFound`: 404
//! - `Internal`: 500, detail logged but never exposed

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::upstream::ServiceName;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("upstream responded with {status}")]
    UpstreamFailure { status: StatusCode, body: Value },

    #[error("{} did not respond in time", .0.label())]
    UpstreamTimeout(ServiceName),

    #[error("circuit open for {service}")]
    CircuitOpen { service: ServiceName, fallback: Value },

    #[error("Service {0} not found")]
    UnknownService(String),

    #[error("Route {0} does not exist")]
    RouteNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::UpstreamFailure { status, .. } => *status,
            GatewayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UnknownService(_) | GatewayError::RouteNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            GatewayError::UpstreamFailure { body, .. } => body,
            GatewayError::CircuitOpen { fallback, .. } => fallback,
            GatewayError::UpstreamTimeout(_) => json!({
                "success": false,
                "error": self.to_string(),
                "timeout": true,
            }),
            GatewayError::UnknownService(_) | GatewayError::RouteNotFound(_) => json!({
                "success": false,
                "error": self.to_string(),
            }),
            GatewayError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal gateway error");
                json!({ "success": false, "error": "Internal gateway error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_upstream_failure_is_forwarded_verbatim() {
        let response = GatewayError::UpstreamFailure {
            status: StatusCode::NOT_FOUND,
            body: json!({ "success": false, "error": "Article not found" }),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await["error"], "Article not found");
    }

    #[tokio::test]
    async fn test_timeout_is_504() {
        let response = GatewayError::UpstreamTimeout(ServiceName::Article).into_response();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = body_of(response).await;
        assert_eq!(body["timeout"], true);
        assert_eq!(body["error"], "Article service did not respond in time");
    }

    #[tokio::test]
    async fn test_circuit_open_returns_fallback() {
        let response = GatewayError::CircuitOpen {
            service: ServiceName::Comment,
            fallback: json!({ "success": false, "fallback": true }),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_of(response).await["fallback"], true);
    }

    #[tokio::test]
    async fn test_internal_hides_detail() {
        let response = GatewayError::Internal("pool poisoned".into()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await["error"], "Internal gateway error");
    }

    #[test]
    fn test_not_found_messages() {
        assert_eq!(
            GatewayError::RouteNotFound("/api/users".into()).to_string(),
            "Route /api/users does not exist"
        );
        assert_eq!(
            GatewayError::UnknownService("userService".into()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
