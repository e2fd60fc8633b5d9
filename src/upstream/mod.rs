//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher picks a service
//!     → service.rs (descriptor: base URL, call timeout)
//!     → client.rs (one HTTP call, outcome classification)
//!     → UpstreamResult back to the circuit breaker
//! ```

pub mod client;
pub mod service;

pub use client::{encode_segment, UpstreamClient, UpstreamFailure, UpstreamResponse, UpstreamResult};
pub use service::{BackendDescriptor, Backends, ServiceName};
