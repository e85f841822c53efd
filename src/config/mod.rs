pub mod types;

use crate::error::{ConfigError, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub use types::Config;

const CONFIG_FILE_NAME: &str = ".stego-sift.toml";

/// Get the global config file path (~/.stego-sift.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (<dir>/.stego-sift.toml)
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Load configuration: an explicit path must exist; otherwise the working
/// directory is checked, then the home directory, then defaults apply.
/// A file that exists but does not parse is an error rather than silently
/// ignored.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let candidates = std::env::current_dir()
        .ok()
        .map(|cwd| local_config_path(&cwd))
        .into_iter()
        .chain(global_config_path());

    for candidate in candidates {
        if candidate.is_file() {
            return read_config(&candidate);
        }
    }

    debug!("No configuration file found, using defaults");
    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&content).map_err(|e| ConfigError::ParsingFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}
