//! # Meadow
//!
//! Headless flythrough over streamed terrain with grass and wind.
//!
//! Usage: `meadow [config.toml]`. Without an argument `meadow.toml` in the
//! working directory is used, and defaults apply when it is missing.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod camera;
mod config;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{SceneConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("meadow=info".parse()?))
        .init();

    info!("Meadow {} starting...", env!("CARGO_PKG_VERSION"));

    let path = std::env::args().nth(1).map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let mut config = SceneConfig::load_from(&path);
    config.clamp();

    let summary = app::run(&config)?;
    info!(
        "Finished at ({:.1}, {:.1}, {:.1}) after {} frames on {}",
        summary.final_position.x,
        summary.final_position.y,
        summary.final_position.z,
        summary.frames,
        if summary.used_gpu { "GPU" } else { "CPU" }
    );
    Ok(())
}
