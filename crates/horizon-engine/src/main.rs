//! # Horizon Engine
//!
//! Headless driver for Project Horizon terrain streaming.
//!
//! Loads `horizon.toml` (or the path given as the first argument), walks an
//! observer through the world and logs what the streaming core does.
//! `horizon --init [path]` writes the default configuration instead.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod timing;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{EngineConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("horizon=info".parse()?))
        .init();

    info!("Project Horizon starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1).peekable();
    let init = args.next_if(|arg| arg == "--init").is_some();
    let path = args.next().unwrap_or_else(|| CONFIG_FILE.to_string());

    if init {
        EngineConfig::default().save_to(&path)?;
        return Ok(());
    }

    let config = EngineConfig::load_from(&path)?;

    app::run(config)?;

    info!("Project Horizon shutdown complete");
    Ok(())
}
