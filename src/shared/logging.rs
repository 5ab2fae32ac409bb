//! Logging setup.
//!
//! Installs a global `tracing` subscriber writing to stdout. The filter comes
//! from `RUST_LOG` when set.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

use crate::shared::error::{AppError, AppResult};

const DEFAULT_FILTER: &str = "plantcare_client=info";

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize tracing. Subsequent calls are no-ops.
pub fn init() -> AppResult<()> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(fmt::layer().with_target(true).with_writer(std::io::stdout));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Config(format!("Failed to install tracing subscriber: {}", e)))?;
    let _ = INITIALIZED.set(());

    tracing::info!("Logging initialized");
    Ok(())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
