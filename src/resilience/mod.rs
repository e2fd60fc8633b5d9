//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → registry.rs (pick the breaker for the service)
//!     → circuit_breaker.rs (admit or short-circuit, enforce the call timeout)
//!     → window.rs (record the outcome, evaluate the error rate)
//!     → events.rs (publish transitions and fallbacks)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - No retries: a failed call counts once against the breaker
//! - Circuit breaker prevents cascading failures

pub mod circuit_breaker;
pub mod events;
pub mod registry;
pub mod window;

pub use circuit_breaker::{BreakerConfig, BreakerSnapshot, CallOutcome, CircuitBreaker, CircuitState};
pub use events::BreakerEvent;
pub use registry::BreakerRegistry;
