//! # Quincena Engine
//!
//! Headless host for the Operación Quincena gameplay core.
//!
//! Ties the gameplay session to a fixed-step clock, arcade physics and a
//! scripted driver for the heroes, then prints a JSON summary of the run.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod host;
mod input;
mod timing;
mod world;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{EngineConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("quincena=info".parse()?))
        .init();

    info!("Operación Quincena starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_FILE.to_string());
    let config = EngineConfig::load_from(&config_path);

    let summary = app::run(&config)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!("Run finished: {:?} on level {}", summary.outcome, summary.level);
    Ok(())
}
