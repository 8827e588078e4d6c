// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Configuration loading and validation.

use crate::error::{ConfigError, HostError, Result};
use std::path::{Path, PathBuf};

use super::schema::HostConfig;

/// Configuration file names to search for, in order of priority.
const CONFIG_FILES: &[&str] = &["hostlink.toml", ".hostlink.toml", ".config/hostlink.toml"];

/// Find the configuration file in the current directory or parent directories.
pub fn find_config_file() -> Option<PathBuf> {
    let current_dir = std::env::current_dir().ok()?;
    find_config_file_from(&current_dir)
}

/// Find the configuration file starting from a specific directory.
pub fn find_config_file_from(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        for config_name in CONFIG_FILES {
            let config_path = current.join(config_name);
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // Try parent directory
        if !current.pop() {
            break;
        }
    }

    // Also check user's home directory
    if let Some(home) = dirs::home_dir() {
        for config_name in CONFIG_FILES {
            let config_path = home.join(config_name);
            if config_path.exists() {
                return Some(config_path);
            }
        }
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        let host_config = config_dir.join("hostlink").join("config.toml");
        if host_config.exists() {
            return Some(host_config);
        }
    }

    None
}

/// Load configuration from the default locations.
pub fn load_config() -> Result<HostConfig> {
    match find_config_file() {
        Some(path) => load_config_from(&path),
        None => {
            tracing::debug!("No configuration file found, using defaults");
            Ok(HostConfig::default())
        }
    }
}

/// Load configuration from a specific path.
pub fn load_config_from(path: &Path) -> Result<HostConfig> {
    tracing::debug!("Loading configuration from: {:?}", path);

    if !path.exists() {
        return Err(HostError::Config(ConfigError::NotFound {
            path: path.to_path_buf(),
        }));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        HostError::Config(ConfigError::ParseError {
            message: format!("Failed to read config file: {}", e),
        })
    })?;

    let mut config = parse_config(&content)?;
    config.source = Some(path.to_path_buf());
    Ok(config)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<HostConfig> {
    let config: HostConfig = toml::from_str(content).map_err(|e| {
        HostError::Config(ConfigError::ParseError {
            message: format!("Failed to parse TOML: {}", e),
        })
    })?;

    validate(&config)?;
    Ok(config)
}

/// Reject values that parse but cannot work.
fn validate(config: &HostConfig) -> Result<()> {
    if config.host.drain_timeout_ms == 0 {
        return Err(invalid("host.drain_timeout_ms", "must be greater than zero"));
    }

    if config.exports.version == 0 {
        return Err(invalid(
            "exports.version",
            "0 is reserved for unstamped plugins",
        ));
    }

    for library in &config.exports.libraries {
        if library.name.trim().is_empty() {
            return Err(invalid("exports.libraries.name", "must not be empty"));
        }
    }

    if config.plugins.scan && config.plugins.directory.is_none() {
        return Err(invalid("plugins.scan", "requires plugins.directory"));
    }

    Ok(())
}

fn invalid(key: &str, message: &str) -> HostError {
    HostError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    })
}
