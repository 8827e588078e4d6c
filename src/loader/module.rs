// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Module backend seams.
//!
//! The loader talks to native modules through these traits so that the
//! load/lifecycle rules can be exercised without compiled plugin binaries.

use serde_json::Value;

use crate::error::LoadError;
use crate::registry::PluginDescriptor;

/// Opens plugin modules.
pub trait ModuleBackend {
    /// Open the module for `descriptor`, binding its external references
    /// eagerly.
    fn open(&self, descriptor: &PluginDescriptor) -> Result<Box<dyn PluginModule>, LoadError>;
}

/// An opened plugin module.
pub trait PluginModule: Send {
    /// Host symbols the module declares it requires.
    fn imports(&self) -> Vec<String>;

    /// Resolve the module's entry-point table.
    fn bind(&self) -> Result<BoundEntryPoints, LoadError>;
}

/// Calls into a plugin's entry points.
pub trait EntryPoints: Send {
    /// Initialize the plugin with its settings payload.
    fn initialize(&mut self, settings: &Value) -> Result<(), String>;

    /// Start the plugin's own activity.
    fn start(&mut self) -> Result<(), String>;

    /// Stop the plugin's activity.
    fn stop(&mut self) -> Result<(), String>;
}

/// Entry points resolved at load time, with the stamps the plugin carries.
pub struct BoundEntryPoints {
    /// ABI version declared by the plugin.
    pub abi_version: u32,
    /// Export manifest version the plugin was built against.
    pub manifest_version: u32,
    /// The callable entry points.
    pub calls: Box<dyn EntryPoints>,
}

impl std::fmt::Debug for BoundEntryPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundEntryPoints")
            .field("abi_version", &self.abi_version)
            .field("manifest_version", &self.manifest_version)
            .finish_non_exhaustive()
    }
}
