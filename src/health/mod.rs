//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → probe.rs (each backend's /health, concurrently, short timeout)
//!     → breaker states read from the registry
//!     → one combined document
//! ```
//!
//! # Design Decisions
//! - Probes are independent of breaker state and never counted by a breaker
//! - Health is checked on request, not on a timer

pub mod probe;

pub use probe::gateway_health;
