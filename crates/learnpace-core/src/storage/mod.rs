mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, GoalsConfig, ScheduleConfig, StreakConfig, UserConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `LEARNPACE_DATA_DIR` overrides the location entirely. Otherwise the
/// directory is `~/.config/learnpace/`, or `~/.config/learnpace-dev/` when
/// `LEARNPACE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("LEARNPACE_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("LEARNPACE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("learnpace-dev")
            } else {
                base_dir.join("learnpace")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
