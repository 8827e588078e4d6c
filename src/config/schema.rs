// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Configuration schema definitions.
//!
//! Defines all configuration structures that can be loaded from hostlink.toml.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::lifecycle::StartupPolicy;
use crate::manifest::LibraryEntry;

/// The main configuration structure for hostlink.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HostConfig {
    /// Host process settings.
    pub host: HostSettings,

    /// Libraries the host exports to plugins.
    pub exports: ExportsConfig,

    /// Platform link settings.
    pub link: LinkConfig,

    /// Plugin declarations.
    pub plugins: PluginsConfig,

    /// File this configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl HostConfig {
    /// Load configuration from the default locations.
    pub fn load() -> crate::error::Result<Self> {
        super::loader::load_config()
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &std::path::Path) -> crate::error::Result<Self> {
        super::loader::load_config_from(path)
    }

    /// Directory relative paths in this configuration are resolved against.
    ///
    /// This is the directory holding the configuration file, or the working
    /// directory for a configuration that was not read from disk.
    pub fn base_dir(&self) -> PathBuf {
        self.source
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve a configured path against [`base_dir`](Self::base_dir).
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }
}

/// Host process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// What a plugin failure during startup does to the rest of startup.
    pub startup_policy: StartupPolicy,

    /// How long a running plugin gets to stop before it is force-unloaded.
    pub drain_timeout_ms: u64,

    /// Configuration directory handed to plugins.
    pub config_dir: PathBuf,

    /// Runtime/state directory handed to plugins.
    pub state_dir: PathBuf,
}

impl HostSettings {
    /// Drain timeout as a [`Duration`].
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            startup_policy: StartupPolicy::Fatal,
            drain_timeout_ms: 5000,
            config_dir: PathBuf::from("etc"),
            state_dir: PathBuf::from("var"),
        }
    }
}

/// Export manifest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportsConfig {
    /// Manifest version stamp plugins are built against.
    pub version: u32,

    /// Statically linked libraries exported to plugins.
    pub libraries: Vec<LibraryEntry>,
}

impl Default for ExportsConfig {
    fn default() -> Self {
        Self {
            version: 1,
            libraries: Vec::new(),
        }
    }
}

/// Platform link configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LinkConfig {
    /// Output of the pre-link pass on platforms that need one.
    pub prelink_object: Option<PathBuf>,
}

/// Plugin configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory scanned for plugin modules when `scan` is set.
    pub directory: Option<PathBuf>,

    /// Whether to add modules found in `directory` to the declared plugins.
    pub scan: bool,

    /// Declared plugins, in load order.
    pub entries: Vec<PluginEntry>,
}

/// A single declared plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginEntry {
    /// Unique plugin name.
    pub name: String,

    /// Path to the plugin module.
    pub path: PathBuf,

    /// Whether the plugin is loaded at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Libraries the plugin links statically itself.
    #[serde(default)]
    pub links: Vec<String>,

    /// Plugin-specific settings, passed through to its initialize entry point.
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl PluginEntry {
    /// Create an enabled entry with no settings.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            enabled: true,
            links: Vec::new(),
            settings: serde_json::Value::Null,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.host.startup_policy, StartupPolicy::Fatal);
        assert_eq!(config.host.drain_timeout(), Duration::from_secs(5));
        assert_eq!(config.exports.version, 1);
        assert!(config.plugins.entries.is_empty());
    }

    #[test]
    fn test_plugin_entry_defaults() {
        let entry: PluginEntry = toml::from_str(
            r#"
name = "router"
path = "plugins/librouter.so"
"#,
        )
        .unwrap();
        assert!(entry.enabled);
        assert!(entry.links.is_empty());
        assert!(entry.settings.is_null());
    }

    #[test]
    fn test_settings_keep_structure() {
        let entry: PluginEntry = toml::from_str(
            r#"
name = "router"
path = "librouter.so"
settings = { listen = "0.0.0.0:1883", workers = 4, tls = { enabled = false } }
"#,
        )
        .unwrap();
        assert_eq!(entry.settings["workers"], 4);
        assert_eq!(entry.settings["tls"]["enabled"], false);
    }

    #[test]
    fn test_resolve_path_uses_config_dir() {
        let config = HostConfig {
            source: Some(PathBuf::from("/srv/host/hostlink.toml")),
            ..HostConfig::default()
        };
        assert_eq!(
            config.resolve_path(Path::new("plugins/a.so")),
            PathBuf::from("/srv/host/plugins/a.so")
        );
        assert_eq!(
            config.resolve_path(Path::new("/abs/b.so")),
            PathBuf::from("/abs/b.so")
        );
    }

    #[test]
    fn test_config_serialization() {
        let config = HostConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("drain_timeout_ms"));
    }
}
