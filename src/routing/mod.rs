//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → axum route table (compiled at startup)
//!     → articles.rs / comments.rs handler
//!     → dispatch.rs (breaker-guarded backend call)
//!     → handler shapes the response (merge for the composite read)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - Failure short-circuit on the composite read, never parallel fan-out

pub mod articles;
pub mod comments;
pub mod dispatch;

use axum::{
    http::Uri,
    routing::get,
    Router,
};

use crate::error::GatewayError;
use crate::http::AppState;

pub use dispatch::Dispatcher;

/// Article and comment routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/articles",
            get(articles::list_articles).post(articles::create_article),
        )
        .route(
            "/api/articles/{id}",
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        .route(
            "/api/articles/{id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
}

/// Fallback for anything no route matched.
pub async fn route_not_found(uri: Uri) -> GatewayError {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    tracing::debug!(path = %path, "No route matched");
    GatewayError::RouteNotFound(path)
}
