// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Plugin descriptor registry.
//!
//! Turns configured plugin entries into an ordered, deduplicated list of
//! [`PluginDescriptor`]s. Declaration order is load order.

mod descriptor;
mod scan;

pub use descriptor::{PluginDescriptor, RuntimeLayout};
pub use scan::scan_directory;

use crate::config::PluginEntry;
use crate::error::RegistryError;
use std::collections::HashSet;

/// The plugins known to the host.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    descriptors: Vec<PluginDescriptor>,
}

impl PluginRegistry {
    /// Build the registry from configured entries.
    ///
    /// Fails on duplicate names and on enabled entries whose path does not
    /// exist. The path check is advisory; the loader has the final word.
    pub fn discover(
        entries: &[PluginEntry],
        layout: &RuntimeLayout,
    ) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut descriptors = Vec::with_capacity(entries.len());

        for entry in entries {
            let name = entry.name.trim();
            if name.is_empty() || name != entry.name {
                return Err(RegistryError::InvalidName {
                    name: entry.name.clone(),
                });
            }

            if !seen.insert(entry.name.clone()) {
                return Err(RegistryError::DuplicateName {
                    name: entry.name.clone(),
                });
            }

            let path = layout.resolve(&entry.path);
            if entry.enabled && !path.exists() {
                return Err(RegistryError::InvalidPath {
                    name: entry.name.clone(),
                    path,
                });
            }

            descriptors.push(PluginDescriptor {
                name: entry.name.clone(),
                path,
                enabled: entry.enabled,
                settings: layout.inject(entry.settings.clone()),
                links: entry.links.clone(),
            });
        }

        tracing::debug!("Discovered {} plugin descriptor(s)", descriptors.len());
        Ok(Self { descriptors })
    }

    /// Merge scanned entries behind declared ones. Declared names win.
    pub fn merge_scanned(declared: &[PluginEntry], scanned: Vec<PluginEntry>) -> Vec<PluginEntry> {
        let mut merged = declared.to_vec();
        for entry in scanned {
            if merged.iter().any(|e| e.name == entry.name) {
                tracing::debug!("Scanned plugin '{}' shadowed by declaration", entry.name);
                continue;
            }
            merged.push(entry);
        }
        merged
    }

    /// All descriptors, in declaration order.
    pub fn descriptors(&self) -> &[PluginDescriptor] {
        &self.descriptors
    }

    /// Enabled descriptors, in declaration order.
    pub fn enabled(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.descriptors.iter().filter(|d| d.enabled)
    }

    /// Look up a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
