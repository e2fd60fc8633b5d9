//! Comment routes, all through the comment breaker.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method},
    response::Response,
};

use crate::error::GatewayError;
use crate::http::request::request_id;
use crate::http::response::outcome_response;
use crate::http::AppState;
use crate::routing::articles::comments_path;
use crate::upstream::ServiceName;

pub async fn list_comments(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let outcome = state
        .dispatcher
        .call(
            ServiceName::Comment,
            Method::GET,
            comments_path(&article_id),
            None,
            request_id(&headers),
        )
        .await?;
    Ok(outcome_response(ServiceName::Comment, outcome))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let outcome = state
        .dispatcher
        .call(
            ServiceName::Comment,
            Method::POST,
            comments_path(&article_id),
            Some(body),
            request_id(&headers),
        )
        .await?;
    Ok(outcome_response(ServiceName::Comment, outcome))
}
