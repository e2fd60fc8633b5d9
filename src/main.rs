//! Blog API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                     API GATEWAY                       │
//!                       │                                                       │
//!   Client Request      │  ┌─────────┐    ┌──────────┐    ┌────────────────┐   │
//!   ────────────────────┼─▶│  http   │───▶│ routing  │───▶│   dispatcher   │   │
//!                       │  │ server  │    │ handlers │    │                │   │
//!                       │  └─────────┘    └──────────┘    └───────┬────────┘   │
//!                       │                                         │            │
//!                       │                                         ▼            │
//!                       │                                 ┌────────────────┐   │
//!                       │                                 │ circuit breaker│   │
//!                       │                                 │ (per backend)  │   │
//!                       │                                 └───────┬────────┘   │
//!                       │                                         │            │     Article
//!   Client Response     │  ┌─────────┐    ┌──────────┐    ┌───────▼────────┐   │     service
//!   ◀───────────────────┼──│response │◀───│  merge / │◀───│ upstream client│◀──┼──── Comment
//!                       │  │ shaping │    │ fallback │    │                │   │     service
//!                       │  └─────────┘    └──────────┘    └────────────────┘   │
//!                       │                                                       │
//!                       │  config · admin · health · observability · lifecycle  │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use blog_gateway::config::GatewayConfig;
use blog_gateway::lifecycle::startup;
use blog_gateway::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "blog-gateway", version, about = "API gateway with per-backend circuit breakers")]
struct Args {
    /// Path to a TOML config file; defaults plus environment when omitted
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (config, source): (GatewayConfig, _) = startup::load(args.config.as_deref())?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "blog-gateway starting");
    tracing::info!(source = %source, "Configuration read");

    startup::run(config).await?;
    Ok(())
}
