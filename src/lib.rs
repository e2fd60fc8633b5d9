//! Blog API gateway library.
//!
//! Fronts the article and comment services with one circuit breaker per
//! backend, and assembles the article-with-comments view.

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod routing;
pub mod upstream;

// Backend protection
pub mod health;
pub mod resilience;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
