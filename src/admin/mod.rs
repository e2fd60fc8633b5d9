//! Administrative routes: breaker status, synthetic test calls, force reset.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use self::handlers::*;
use crate::http::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/circuit-breaker/test/{service}", post(test_breaker))
        .route("/api/circuit-breaker/reset/{service}", post(reset_breaker))
}
