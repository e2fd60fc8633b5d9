//! Article routes.
//!
//! Every route goes through the article breaker. The single-article read
//! also fetches comments, but only once the article itself is in hand.
//! Client-supplied ids are percent-encoded before they reach a backend path.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::http::request::request_id;
use crate::http::response::outcome_response;
use crate::http::AppState;
use crate::resilience::CallOutcome;
use crate::upstream::{encode_segment, ServiceName};

fn article_path(id: &str) -> String {
    format!("/api/articles/{}", encode_segment(id))
}

pub(crate) fn comments_path(article_id: &str) -> String {
    format!("/api/articles/{}/comments", encode_segment(article_id))
}

pub async fn list_articles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let outcome = state
        .dispatcher
        .call(
            ServiceName::Article,
            Method::GET,
            "/api/articles".to_string(),
            None,
            request_id(&headers),
        )
        .await?;
    Ok(outcome_response(ServiceName::Article, outcome))
}

/// Article plus its comments. Comment degradation never fails the request.
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let request_id = request_id(&headers);

    let article = state
        .dispatcher
        .call(
            ServiceName::Article,
            Method::GET,
            article_path(&id),
            None,
            request_id.clone(),
        )
        .await?
        .into_result(ServiceName::Article)?;

    let comments = state
        .dispatcher
        .call(
            ServiceName::Comment,
            Method::GET,
            comments_path(&id),
            None,
            request_id,
        )
        .await;
    let comments = match comments {
        Ok(CallOutcome::Success(response)) => response.body,
        Ok(degraded) => {
            tracing::warn!(
                article_id = %id,
                outcome = degraded.label(),
                "Comments unavailable, serving article without them"
            );
            Value::Array(Vec::new())
        }
        Err(e) => {
            tracing::warn!(article_id = %id, error = %e, "Comments request failed, serving article without them");
            Value::Array(Vec::new())
        }
    };

    Ok(Json(merge_article_with_comments(article.body, comments)).into_response())
}

pub async fn create_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let outcome = state
        .dispatcher
        .call(
            ServiceName::Article,
            Method::POST,
            "/api/articles".to_string(),
            Some(body),
            request_id(&headers),
        )
        .await?;
    Ok(outcome_response(ServiceName::Article, outcome))
}

pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let outcome = state
        .dispatcher
        .call(
            ServiceName::Article,
            Method::PUT,
            article_path(&id),
            Some(body),
            request_id(&headers),
        )
        .await?;
    Ok(outcome_response(ServiceName::Article, outcome))
}

pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let outcome = state
        .dispatcher
        .call(
            ServiceName::Article,
            Method::DELETE,
            article_path(&id),
            None,
            request_id(&headers),
        )
        .await?;
    Ok(outcome_response(ServiceName::Article, outcome))
}

/// Add a `comments` field to the article document.
///
/// A non-object article body is wrapped as `{ "data": <body>, "comments": ... }`.
pub fn merge_article_with_comments(article: Value, comments: Value) -> Value {
    let mut merged = match article {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    merged.insert("comments".to_string(), comments);
    Value::Object(merged)
}
