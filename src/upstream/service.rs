//! Backend identity and descriptors.
//!
//! # Responsibilities
//! - Name the backends the gateway fronts (closed set, known at compile time)
//! - Parse external service names at the boundary
//! - Hold the immutable address and call timeout of each backend
//!
//! # Design Decisions
//! - One upstream address per service, no pool
//! - Descriptors are built once from config and never change

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// A backend known to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ServiceName {
    #[serde(rename = "articleService")]
    Article,
    #[serde(rename = "commentService")]
    Comment,
}

impl ServiceName {
    /// Every service, in registry order.
    pub const ALL: [ServiceName; 2] = [ServiceName::Article, ServiceName::Comment];

    /// External name used in status payloads and admin routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Article => "articleService",
            ServiceName::Comment => "commentService",
        }
    }

    /// Human-readable label for degraded-service messages.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceName::Article => "Article service",
            ServiceName::Comment => "Comment service",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ServiceName::Article => 0,
            ServiceName::Comment => 1,
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceName {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "articleService" | "article" => Ok(ServiceName::Article),
            "commentService" | "comment" => Ok(ServiceName::Comment),
            other => Err(GatewayError::UnknownService(other.to_string())),
        }
    }
}

/// Immutable description of a single backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub service: ServiceName,
    pub base_url: Url,
    pub call_timeout: Duration,
}

impl BackendDescriptor {
    pub fn new(service: ServiceName, base_url: Url, call_timeout: Duration) -> Self {
        Self {
            service,
            base_url,
            call_timeout,
        }
    }

    /// Absolute URL for `path` on this backend.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

/// The descriptors of every backend, indexed by service.
#[derive(Debug, Clone)]
pub struct Backends {
    descriptors: [BackendDescriptor; 2],
}

impl Backends {
    pub fn new(article: BackendDescriptor, comment: BackendDescriptor) -> Self {
        Self {
            descriptors: [
                BackendDescriptor { service: ServiceName::Article, ..article },
                BackendDescriptor { service: ServiceName::Comment, ..comment },
            ],
        }
    }

    /// Build descriptors from the `[backends]` config section.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, url::ParseError> {
        let descriptor = |service: ServiceName| -> Result<BackendDescriptor, url::ParseError> {
            let backend = config.backend(service);
            Ok(BackendDescriptor::new(
                service,
                Url::parse(&backend.base_url)?,
                Duration::from_millis(backend.timeout_ms),
            ))
        };
        Ok(Self::new(
            descriptor(ServiceName::Article)?,
            descriptor(ServiceName::Comment)?,
        ))
    }

    pub fn get(&self, service: ServiceName) -> &BackendDescriptor {
        &self.descriptors[service.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.descriptors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_names() {
        assert_eq!("articleService".parse::<ServiceName>().unwrap(), ServiceName::Article);
        assert_eq!("comment".parse::<ServiceName>().unwrap(), ServiceName::Comment);

        let err = "userService".parse::<ServiceName>().unwrap_err();
        assert!(matches!(err, GatewayError::UnknownService(name) if name == "userService"));
    }

    #[test]
    fn test_url_for_joins_without_double_slash() {
        let backend = BackendDescriptor::new(
            ServiceName::Article,
            Url::parse("http://article-service:3001").unwrap(),
            Duration::from_secs(3),
        );
        assert_eq!(
            backend.url_for("/api/articles"),
            "http://article-service:3001/api/articles"
        );

        let prefixed = BackendDescriptor::new(
            ServiceName::Article,
            Url::parse("http://gateway.local/articles/").unwrap(),
            Duration::from_secs(3),
        );
        assert_eq!(prefixed.url_for("/health"), "http://gateway.local/articles/health");
    }

    #[test]
    fn test_backends_indexed_by_service() {
        let config = GatewayConfig::default();
        let backends = Backends::from_config(&config).unwrap();

        assert_eq!(backends.get(ServiceName::Article).service, ServiceName::Article);
        assert_eq!(backends.get(ServiceName::Comment).base_url.port(), Some(3002));
        assert_eq!(backends.iter().count(), 2);
    }
}
