//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::BreakerConfig;
use crate::upstream::ServiceName;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Addresses and call timeouts of the fronted services.
    pub backends: BackendsConfig,

    /// Circuit breaker tuning shared by every backend.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    pub fn backend(&self, service: ServiceName) -> &BackendConfig {
        match service {
            ServiceName::Article => &self.backends.article,
            ServiceName::Comment => &self.backends.comment,
        }
    }

    /// Breaker settings for `service`; the call timeout is per backend.
    pub fn breaker_config(&self, service: ServiceName) -> BreakerConfig {
        let cb = &self.circuit_breaker;
        BreakerConfig {
            call_timeout: Duration::from_millis(self.backend(service).timeout_ms),
            error_threshold_percentage: cb.error_threshold_percentage,
            rolling_window: Duration::from_millis(cb.rolling_window_ms),
            rolling_buckets: cb.rolling_buckets,
            reset_timeout: Duration::from_millis(cb.reset_timeout_ms),
            minimum_calls: cb.minimum_calls,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// One entry per known service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BackendsConfig {
    pub article: BackendConfig,
    pub comment: BackendConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            article: BackendConfig::new("http://article-service:3001"),
            comment: BackendConfig::new("http://comment-service:3002"),
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackendConfig {
    /// Base URL (e.g., "http://127.0.0.1:3001").
    pub base_url: String,

    /// Deadline for a single call through the breaker, in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub timeout_ms: u64,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: default_call_timeout_ms(),
        }
    }
}

fn default_call_timeout_ms() -> u64 {
    3000
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Error rate in percent (1-100) that opens the circuit.
    pub error_threshold_percentage: u8,

    /// Rolling statistics window in milliseconds.
    pub rolling_window_ms: u64,

    /// Number of buckets in the rolling window.
    pub rolling_buckets: usize,

    /// Time the circuit stays open before a probe, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Calls required in the window before the error rate is evaluated.
    pub minimum_calls: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            error_threshold_percentage: 50,
            rolling_window_ms: 60_000,
            rolling_buckets: 10,
            reset_timeout_ms: 10_000,
            minimum_calls: 10,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Timeout for each backend `/health` probe in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self { timeout_ms: 1000 }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 1000,
            request_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
