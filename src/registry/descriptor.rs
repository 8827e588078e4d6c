// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Plugin descriptors and the runtime directory layout.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::config::HostConfig;

/// A plugin known to the host, built from configuration at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginDescriptor {
    /// Unique, stable plugin name.
    pub name: String,
    /// Absolute path of the plugin module.
    pub path: PathBuf,
    /// Whether the plugin is loaded at startup.
    pub enabled: bool,
    /// Settings passed to the plugin's initialize entry point.
    pub settings: Value,
    /// Libraries the plugin links statically itself.
    pub links: Vec<String>,
}

impl PluginDescriptor {
    /// Create an enabled descriptor with an empty settings object.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            enabled: true,
            settings: Value::Object(Map::new()),
            links: Vec::new(),
        }
    }
}

/// Directories the installation provides to plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeLayout {
    /// Directory configuration paths are resolved against.
    pub base_dir: PathBuf,
    /// Plugin configuration directory.
    pub config_dir: PathBuf,
    /// Plugin runtime/state directory.
    pub state_dir: PathBuf,
}

impl RuntimeLayout {
    /// Derive the layout from host configuration.
    pub fn from_config(config: &HostConfig) -> Self {
        Self {
            base_dir: config.base_dir(),
            config_dir: config.resolve_path(&config.host.config_dir),
            state_dir: config.resolve_path(&config.host.state_dir),
        }
    }

    /// Resolve a declared path against the base directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Add the layout directories to a settings payload.
    ///
    /// Explicit settings win; non-object payloads are wrapped under `value`.
    pub fn inject(&self, settings: Value) -> Value {
        let mut map = match settings {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        map.entry("config_dir")
            .or_insert_with(|| Value::String(self.config_dir.display().to_string()));
        map.entry("state_dir")
            .or_insert_with(|| Value::String(self.state_dir.display().to_string()));

        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layout() -> RuntimeLayout {
        RuntimeLayout {
            base_dir: PathBuf::from("/srv/host"),
            config_dir: PathBuf::from("/srv/host/etc"),
            state_dir: PathBuf::from("/srv/host/var"),
        }
    }

    #[test]
    fn test_inject_into_null() {
        let settings = layout().inject(Value::Null);
        assert_eq!(settings["config_dir"], "/srv/host/etc");
        assert_eq!(settings["state_dir"], "/srv/host/var");
    }

    #[test]
    fn test_inject_keeps_explicit_keys() {
        let settings = layout().inject(json!({ "state_dir": "/tmp/own", "port": 1883 }));
        assert_eq!(settings["state_dir"], "/tmp/own");
        assert_eq!(settings["config_dir"], "/srv/host/etc");
        assert_eq!(settings["port"], 1883);
    }

    #[test]
    fn test_inject_wraps_scalars() {
        let settings = layout().inject(json!("verbose"));
        assert_eq!(settings["value"], "verbose");
        assert!(settings.get("config_dir").is_some());
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            layout().resolve(Path::new("plugins/a.so")),
            PathBuf::from("/srv/host/plugins/a.so")
        );
    }
}
