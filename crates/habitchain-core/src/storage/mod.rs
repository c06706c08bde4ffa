mod config;
pub mod database;
pub mod payouts;

pub use config::{Config, DefaultsConfig, LogConfig};
pub use database::Database;
pub use payouts::PayoutSink;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the habitchain data directory.
///
/// `HABITCHAIN_DATA_DIR` wins when set. Otherwise `~/.config/habitchain`,
/// or `~/.config/habitchain-dev` when `HABITCHAIN_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("HABITCHAIN_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("HABITCHAIN_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("habitchain-dev")
            } else {
                base_dir.join("habitchain")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(ConfigError::DataDir)?;
    Ok(dir)
}
