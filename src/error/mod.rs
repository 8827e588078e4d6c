// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Error types for hostlink.
//!
//! Each stage of host startup (configuration, export manifest, platform
//! link surface, descriptor registry, dynamic loading, lifecycle) owns an
//! error enum. [`HostError`] wraps them all and maps every failure onto a
//! process exit status.

use std::path::PathBuf;
use thiserror::Error;

use crate::host::ExitStatus;

/// The main error type for hostlink operations.
#[derive(Error, Debug)]
pub enum HostError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Export manifest errors
    #[error("Export manifest error: {0}")]
    Manifest(#[from] ManifestError),

    // Export surface errors
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    // Descriptor registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // Dynamic loader errors
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    // Lifecycle errors
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl HostError {
    /// Map this error onto the process exit status it should produce.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            HostError::Link(_) => ExitStatus::ExportSurface,
            HostError::Load(_) => ExitStatus::PluginStartup,
            HostError::Lifecycle(LifecycleError::DrainTimeout { .. }) => ExitStatus::DrainTimeout,
            HostError::Lifecycle(_) => ExitStatus::PluginStartup,
            _ => ExitStatus::Failure,
        }
    }
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to parse configuration: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration file already exists: {path}")]
    AlreadyExists { path: PathBuf },
}

/// Errors raised while building the host export manifest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Export manifest is frozen; no further changes are accepted")]
    ManifestFrozen,

    #[error("Library registered twice: {name}")]
    DuplicateLibrary { name: String },

    #[error("Symbol '{symbol}' exported by both '{first}' and '{second}'")]
    DuplicateSymbol {
        symbol: String,
        first: String,
        second: String,
    },

    #[error("Library '{library}' is linked by plugin '{plugin}' and cannot also be exported by the host")]
    OwnershipConflict { library: String, plugin: String },

    #[error("Invalid symbol name '{symbol}' in library '{library}'")]
    InvalidSymbol { library: String, symbol: String },
}

/// Errors raised while establishing the process export surface.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Target platform '{target}' has no export strategy")]
    UnsupportedPlatform { target: String },

    #[error("{strategy}: {} exported symbol(s) not resolvable in the host image: {}", symbols.len(), symbols.join(", "))]
    MissingExports {
        strategy: String,
        symbols: Vec<String>,
    },

    #[error("Archive pattern '{pattern}' is invalid: {message}")]
    InvalidArchivePattern { pattern: String, message: String },

    #[error("Archive not found for library '{library}': {pattern}")]
    ArchiveNotFound { library: String, pattern: String },

    #[error("Pre-link pass failed: {message}")]
    PrelinkFailed { message: String },

    #[error("Pre-link output missing: {path}")]
    PrelinkOutputMissing { path: PathBuf },

    #[error("Failed to open host image: {message}")]
    HostImage { message: String },
}

/// Descriptor registry errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate plugin name: {name}")]
    DuplicateName { name: String },

    #[error("Plugin '{name}' path does not exist: {path}")]
    InvalidPath { name: String, path: PathBuf },

    #[error("Plugin name is empty or invalid: '{name}'")]
    InvalidName { name: String },
}

/// Dynamic loader errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Plugin already loaded: {name}")]
    AlreadyLoaded { name: String },

    #[error("Plugin '{plugin}' requires unresolved symbol '{symbol}'")]
    SymbolUnresolved { plugin: String, symbol: String },

    #[error("Plugin '{plugin}' ABI mismatch: {message}")]
    AbiMismatch { plugin: String, message: String },

    #[error("Plugin '{plugin}' was built against export manifest v{found}, host provides v{expected}")]
    ManifestVersionMismatch {
        plugin: String,
        expected: u32,
        found: u32,
    },

    #[error("Failed to open plugin '{plugin}': {message}")]
    OpenFailed { plugin: String, message: String },
}

impl LoadError {
    /// Name of the plugin the error refers to.
    pub fn plugin(&self) -> &str {
        match self {
            LoadError::AlreadyLoaded { name } => name,
            LoadError::SymbolUnresolved { plugin, .. }
            | LoadError::AbiMismatch { plugin, .. }
            | LoadError::ManifestVersionMismatch { plugin, .. }
            | LoadError::OpenFailed { plugin, .. } => plugin,
        }
    }
}

/// Lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Plugin not loaded: {name}")]
    NotLoaded { name: String },

    #[error("Plugin '{name}' cannot move from {from} to {to}")]
    InvalidTransition {
        name: String,
        from: String,
        to: String,
    },

    #[error("Plugin '{name}' failed to initialize: {message}")]
    InitializationFailure { name: String, message: String },

    #[error("Plugin '{name}' failed to start: {message}")]
    StartFailure { name: String, message: String },

    #[error("Plugin '{name}' did not stop within {timeout_ms} ms and was force-unloaded")]
    DrainTimeout { name: String, timeout_ms: u128 },

    #[error("Startup aborted by plugin '{name}': {message}")]
    StartupAborted { name: String, message: String },
}

/// Result type alias for hostlink operations.
pub type Result<T> = std::result::Result<T, HostError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: std::error::Error + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| HostError::WithContext {
            context: context.into(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound {
            path: PathBuf::from("/path/to/hostlink.toml"),
        };
        assert!(err.to_string().contains("/path/to/hostlink.toml"));
    }

    #[test]
    fn test_symbol_unresolved_names_plugin_and_symbol() {
        let err = LoadError::SymbolUnresolved {
            plugin: "p2".to_string(),
            symbol: "libX::fn3".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("p2"));
        assert!(text.contains("libX::fn3"));
        assert_eq!(err.plugin(), "p2");
    }

    #[test]
    fn test_missing_exports_lists_symbols() {
        let err = LinkError::MissingExports {
            strategy: "archive-retention".to_string(),
            symbols: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().contains("2 exported symbol(s)"));
        assert!(err.to_string().contains("a, b"));
    }

    #[test]
    fn test_exit_status_mapping() {
        let link: HostError = LinkError::HostImage {
            message: "x".to_string(),
        }
        .into();
        assert_eq!(link.exit_status(), ExitStatus::ExportSurface);

        let aborted: HostError = LifecycleError::StartupAborted {
            name: "p".to_string(),
            message: "boom".to_string(),
        }
        .into();
        assert_eq!(aborted.exit_status(), ExitStatus::PluginStartup);

        let config: HostError = ConfigError::ParseError {
            message: "bad".to_string(),
        }
        .into();
        assert_eq!(config.exit_status(), ExitStatus::Failure);
    }

    #[test]
    fn test_host_error_from_manifest_error() {
        let err: HostError = ManifestError::ManifestFrozen.into();
        assert!(err.to_string().contains("frozen"));
    }
}
