//! Single HTTP calls to a backend.
//!
//! # Responsibilities
//! - Build the backend request (method, path, optional JSON body, request ID)
//! - Percent-encode client-supplied path segments
//! - Send it over a pooled hyper client
//! - Classify the result
//!
//! # Outcome Classification
//! - 2xx: `Ok(UpstreamResponse)`
//! - non-2xx: `UpstreamFailure::Status` with the backend status and body verbatim
//! - connection error: `UpstreamFailure::Status` with a synthesized 502
//! - connect timeout: `UpstreamFailure::Timeout`
//!
//! The overall call deadline belongs to the circuit breaker, not this client.

use std::error::Error as StdError;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, Request, Response, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{json, Value};

use crate::http::X_REQUEST_ID;
use crate::upstream::service::BackendDescriptor;

/// Everything except RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Largest backend body the gateway will buffer.
const MAX_UPSTREAM_BODY: usize = 8 * 1024 * 1024;

/// A buffered backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }
}

/// Why an upstream call did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamFailure {
    /// The backend answered with an error status, or could not be reached.
    Status(UpstreamResponse),
    /// No response before the deadline.
    Timeout,
}

pub type UpstreamResult = Result<UpstreamResponse, UpstreamFailure>;

/// HTTP client shared by every backend call.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
}

impl UpstreamClient {
    /// Create a client whose TCP connects give up after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }

    /// Build the request for `path` on `backend`.
    ///
    /// `path` must already be percent-encoded. Building happens before the
    /// breaker admits the call, so a request the gateway cannot express is
    /// never counted against the backend.
    pub fn build_request(
        backend: &BackendDescriptor,
        method: Method,
        path: &str,
        body: Option<Bytes>,
        request_id: Option<&str>,
    ) -> Result<Request<Body>, axum::http::Error> {
        let mut builder = Request::builder()
            .method(method)
            .uri(backend.url_for(path))
            .header(header::ACCEPT, "application/json");
        if let Some(value) = request_id.and_then(|id| HeaderValue::from_str(id).ok()) {
            builder = builder.header(X_REQUEST_ID, value);
        }
        match body {
            Some(bytes) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(bytes)),
            None => builder.body(Body::empty()),
        }
    }

    /// Send a built request to `backend` and classify the result.
    pub async fn send(&self, backend: &BackendDescriptor, request: Request<Body>) -> UpstreamResult {
        let method = request.method().clone();
        let uri = request.uri().clone();

        tracing::debug!(
            service = %backend.service,
            method = %method,
            url = %uri,
            "Calling upstream"
        );

        let response = match self.client.request(request).await {
            Ok(response) => response,
            Err(e) if is_timeout(&e) => {
                tracing::warn!(service = %backend.service, url = %uri, "Upstream connect timed out");
                return Err(UpstreamFailure::Timeout);
            }
            Err(e) => {
                tracing::warn!(service = %backend.service, url = %uri, error = %e, "Upstream unreachable");
                return Err(unreachable_failure(backend, &e));
            }
        };

        classify(backend, response).await
    }

    /// Fetch a backend's own `/health` document, bypassing any breaker.
    pub async fn get_health(
        &self,
        backend: &BackendDescriptor,
        timeout: Duration,
    ) -> Result<Value, String> {
        let request = Self::build_request(backend, Method::GET, "/health", None, None)
            .map_err(|e| e.to_string())?;
        match tokio::time::timeout(timeout, self.send(backend, request)).await {
            Ok(Ok(response)) => Ok(response.body),
            Ok(Err(UpstreamFailure::Status(response))) => Err(error_message(&response)),
            Ok(Err(UpstreamFailure::Timeout)) | Err(_) => {
                Err(format!("timeout of {}ms exceeded", timeout.as_millis()))
            }
        }
    }
}

async fn classify(
    backend: &BackendDescriptor,
    response: Response<hyper::body::Incoming>,
) -> UpstreamResult {
    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(Body::new(body), MAX_UPSTREAM_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(service = %backend.service, error = %e, "Failed to read upstream body");
            return Err(UpstreamFailure::Status(UpstreamResponse::new(
                StatusCode::BAD_GATEWAY,
                json!({
                    "success": false,
                    "error": format!("Invalid response from {}", backend.service.label()),
                }),
            )));
        }
    };

    let response = UpstreamResponse::new(parts.status, parse_body(&bytes));
    if parts.status.is_success() {
        Ok(response)
    } else {
        Err(UpstreamFailure::Status(response))
    }
}

/// Backend bodies are JSON by contract; anything else is kept as a string.
pub(crate) fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn unreachable_failure(backend: &BackendDescriptor, error: &dyn std::fmt::Display) -> UpstreamFailure {
    UpstreamFailure::Status(UpstreamResponse::new(
        StatusCode::BAD_GATEWAY,
        json!({
            "success": false,
            "error": format!("{} unreachable: {}", backend.service.label(), error),
        }),
    ))
}

fn error_message(response: &UpstreamResponse) -> String {
    response
        .body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status code {}", response.status.as_u16()))
}

fn is_timeout(error: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(error);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = e.source();
    }
    false
}

/// Percent-encode one client-supplied path segment for an upstream URL.
///
/// Only unreserved characters pass through, so a segment can never add a
/// path separator or a query string. Dot segments are encoded as well.
pub fn encode_segment(segment: &str) -> String {
    match segment {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => utf8_percent_encode(segment, PATH_SEGMENT).to_string(),
    }
}
