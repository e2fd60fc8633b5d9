//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, threshold 1-100, buckets >= 1)
//! - Check that backend URLs and the bind address parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;
use crate::upstream::ServiceName;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("{service}: invalid base_url '{url}'")]
    InvalidBackendUrl { service: ServiceName, url: String },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("error_threshold_percentage must be between 1 and 100, got {0}")]
    ThresholdOutOfRange(u8),

    #[error("rolling_window_ms ({window_ms}) must be divisible by rolling_buckets ({buckets})")]
    UnevenWindow { window_ms: u64, buckets: usize },

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    for service in ServiceName::ALL {
        let backend = config.backend(service);
        let valid = Url::parse(&backend.base_url)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidBackendUrl {
                service,
                url: backend.base_url.clone(),
            });
        }
        if backend.timeout_ms == 0 {
            errors.push(ValidationError::ZeroValue {
                field: match service {
                    ServiceName::Article => "backends.article.timeout_ms",
                    ServiceName::Comment => "backends.comment.timeout_ms",
                },
            });
        }
    }

    let cb = &config.circuit_breaker;
    if !(1..=100).contains(&cb.error_threshold_percentage) {
        errors.push(ValidationError::ThresholdOutOfRange(cb.error_threshold_percentage));
    }
    if cb.rolling_buckets == 0 {
        errors.push(ValidationError::ZeroValue { field: "circuit_breaker.rolling_buckets" });
    }
    if cb.rolling_window_ms == 0 {
        errors.push(ValidationError::ZeroValue { field: "circuit_breaker.rolling_window_ms" });
    } else if cb.rolling_buckets > 0 && cb.rolling_window_ms % cb.rolling_buckets as u64 != 0 {
        errors.push(ValidationError::UnevenWindow {
            window_ms: cb.rolling_window_ms,
            buckets: cb.rolling_buckets,
        });
    }
    if cb.reset_timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue { field: "circuit_breaker.reset_timeout_ms" });
    }

    if config.health_check.timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue { field: "health_check.timeout_ms" });
    }
    if config.timeouts.connect_ms == 0 {
        errors.push(ValidationError::ZeroValue { field: "timeouts.connect_ms" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue { field: "timeouts.request_secs" });
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroValue { field: "limits.max_body_size" });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.backends.comment.base_url = "ftp://comments".into();
        config.circuit_breaker.error_threshold_percentage = 0;
        config.circuit_breaker.rolling_window_ms = 1000;
        config.circuit_breaker.rolling_buckets = 3;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ThresholdOutOfRange(0)));
        assert!(errors.contains(&ValidationError::UnevenWindow {
            window_ms: 1000,
            buckets: 3
        }));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InvalidBackendUrl { service: ServiceName::Comment, .. }
        )));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = GatewayConfig::default();
        config.backends.article.timeout_ms = 0;
        config.health_check.timeout_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroValue {
            field: "backends.article.timeout_ms"
        }));
        assert!(errors.contains(&ValidationError::ZeroValue {
            field: "health_check.timeout_ms"
        }));
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_enabled = false;
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());
    }
}
