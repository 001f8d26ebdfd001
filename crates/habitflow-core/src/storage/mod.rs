mod config;
pub mod database;
pub mod memory;
pub mod migrations;

pub use config::{Config, MomentumConfig, StorageConfig, TruthConfig};
pub use database::HabitStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/habitflow[-dev]/` based on HABITFLOW_ENV.
///
/// Set HABITFLOW_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HABITFLOW_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("habitflow-dev")
    } else {
        base_dir.join("habitflow")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
