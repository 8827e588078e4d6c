// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Host dependency aggregator.

use crate::error::ManifestError;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::entry::{is_valid_symbol, HostExportManifest, LibraryEntry};

/// Collects the libraries the host exports and freezes them into a manifest.
///
/// Libraries a plugin links itself are declared here as well, so the
/// one-owner-per-library rule is enforced while the manifest is built
/// instead of surfacing later as duplicated allocator or logger state.
#[derive(Debug, Default)]
pub struct HostDependencyAggregator {
    version: u32,
    libraries: Vec<LibraryEntry>,
    symbol_owners: HashMap<String, String>,
    plugin_links: BTreeMap<String, String>,
    frozen: bool,
}

impl HostDependencyAggregator {
    /// Create an aggregator that will stamp the manifest with `version`.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Whether [`finalize`](Self::finalize) has been called.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Record that `plugin` statically links `libraries` itself.
    pub fn declare_plugin_dependencies<I, S>(
        &mut self,
        plugin: &str,
        libraries: I,
    ) -> Result<(), ManifestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.frozen {
            return Err(ManifestError::ManifestFrozen);
        }

        let libraries: Vec<String> = libraries
            .into_iter()
            .map(|library| library.as_ref().to_string())
            .collect();

        if let Some(library) = libraries
            .iter()
            .find(|library| self.libraries.iter().any(|lib| &lib.name == *library))
        {
            return Err(ManifestError::OwnershipConflict {
                library: library.clone(),
                plugin: plugin.to_string(),
            });
        }

        for library in libraries {
            self.plugin_links
                .entry(library)
                .or_insert_with(|| plugin.to_string());
        }

        Ok(())
    }

    /// Append a library to the working set.
    pub fn register_library(&mut self, entry: LibraryEntry) -> Result<(), ManifestError> {
        if self.frozen {
            return Err(ManifestError::ManifestFrozen);
        }

        if let Some(plugin) = self.plugin_links.get(&entry.name) {
            return Err(ManifestError::OwnershipConflict {
                library: entry.name.clone(),
                plugin: plugin.clone(),
            });
        }

        if self.libraries.iter().any(|lib| lib.name == entry.name) {
            return Err(ManifestError::DuplicateLibrary { name: entry.name });
        }

        for symbol in &entry.symbols {
            if !is_valid_symbol(symbol) {
                return Err(ManifestError::InvalidSymbol {
                    library: entry.name.clone(),
                    symbol: symbol.clone(),
                });
            }
            if let Some(first) = self.symbol_owners.get(symbol) {
                return Err(ManifestError::DuplicateSymbol {
                    symbol: symbol.clone(),
                    first: first.clone(),
                    second: entry.name.clone(),
                });
            }
        }

        // A library may list a symbol twice; the first listing wins.
        for symbol in &entry.symbols {
            self.symbol_owners
                .entry(symbol.clone())
                .or_insert_with(|| entry.name.clone());
        }

        tracing::debug!(
            library = %entry.name,
            symbols = entry.symbols.len(),
            "Registered host library"
        );
        self.libraries.push(entry);
        Ok(())
    }

    /// Freeze the working set. Must be called exactly once, before any load.
    pub fn finalize(&mut self) -> Result<Arc<HostExportManifest>, ManifestError> {
        if self.frozen {
            return Err(ManifestError::ManifestFrozen);
        }
        self.frozen = true;

        let manifest = HostExportManifest::new(self.version, std::mem::take(&mut self.libraries));
        tracing::info!(
            version = manifest.version(),
            libraries = manifest.libraries().len(),
            symbols = manifest.symbol_count(),
            "Host export manifest finalized"
        );
        Ok(Arc::new(manifest))
    }
}
