// Author: Eshan Roy
// SPDX-License-Identifier: MIT

use std::collections::HashSet;
use std::sync::Arc;

use super::abi::{ABI_VERSION, UNSTAMPED};
use super::module::ModuleBackend;
use crate::error::LoadError;
use crate::lifecycle::PluginHandle;
use crate::manifest::HostExportManifest;
use crate::registry::PluginDescriptor;

/// Loads plugin modules and resolves them against the export manifest.
///
/// A failed load leaves nothing behind: the module is dropped before the
/// error is returned and the plugin is not recorded as loaded.
pub struct DynamicLoader {
    manifest: Arc<HostExportManifest>,
    backend: Box<dyn ModuleBackend>,
    loaded: HashSet<String>,
}

impl DynamicLoader {
    pub fn new(manifest: Arc<HostExportManifest>, backend: Box<dyn ModuleBackend>) -> Self {
        Self {
            manifest,
            backend,
            loaded: HashSet::new(),
        }
    }

    /// The manifest plugins are resolved against.
    pub fn manifest(&self) -> &Arc<HostExportManifest> {
        &self.manifest
    }

    /// Whether a plugin with this name currently holds a loaded module.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    /// Load the plugin described by `descriptor`.
    pub fn load(&mut self, descriptor: &PluginDescriptor) -> Result<PluginHandle, LoadError> {
        let name = descriptor.name.as_str();

        if self.loaded.contains(name) {
            return Err(LoadError::AlreadyLoaded {
                name: name.to_string(),
            });
        }

        let module = self.backend.open(descriptor)?;

        if let Some(symbol) = module
            .imports()
            .into_iter()
            .find(|symbol| !self.manifest.contains_symbol(symbol))
        {
            return Err(LoadError::SymbolUnresolved {
                plugin: name.to_string(),
                symbol,
            });
        }

        let bound = module.bind()?;

        if bound.abi_version != ABI_VERSION {
            return Err(LoadError::AbiMismatch {
                plugin: name.to_string(),
                message: format!(
                    "ABI version {} (host speaks {})",
                    bound.abi_version, ABI_VERSION
                ),
            });
        }

        if bound.manifest_version == UNSTAMPED {
            tracing::warn!(
                "Plugin '{}' carries no export manifest stamp; accepting it against version {}",
                name,
                self.manifest.version()
            );
        } else if bound.manifest_version != self.manifest.version() {
            return Err(LoadError::ManifestVersionMismatch {
                plugin: name.to_string(),
                expected: self.manifest.version(),
                found: bound.manifest_version,
            });
        }

        self.loaded.insert(name.to_string());
        tracing::info!("Loaded plugin '{}' from {}", name, descriptor.path.display());

        Ok(PluginHandle::new(descriptor.clone(), module, bound.calls))
    }

    /// Forget a loaded plugin. Returns whether it was loaded.
    pub fn release(&mut self, name: &str) -> bool {
        self.loaded.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::lifecycle::PluginState;
    use crate::loader::module::{BoundEntryPoints, EntryPoints, PluginModule};
    use crate::manifest::{HostDependencyAggregator, LibraryEntry};
    use serde_json::Value;

    struct Noop;

    impl EntryPoints for Noop {
        fn initialize(&mut self, _settings: &Value) -> Result<(), String> {
            Ok(())
        }
        fn start(&mut self) -> Result<(), String> {
            Ok(())
        }
        fn stop(&mut self) -> Result<(), String> {
            Ok(())
        }
    }

    struct StubModule {
        imports: Vec<String>,
        abi: u32,
        stamp: u32,
    }

    impl PluginModule for StubModule {
        fn imports(&self) -> Vec<String> {
            self.imports.clone()
        }

        fn bind(&self) -> Result<BoundEntryPoints, LoadError> {
            Ok(BoundEntryPoints {
                abi_version: self.abi,
                manifest_version: self.stamp,
                calls: Box::new(Noop),
            })
        }
    }

    struct StubBackend {
        imports: Vec<&'static str>,
        abi: u32,
        stamp: u32,
    }

    impl ModuleBackend for StubBackend {
        fn open(&self, _descriptor: &PluginDescriptor) -> Result<Box<dyn PluginModule>, LoadError> {
            Ok(Box::new(StubModule {
                imports: self.imports.iter().map(|s| s.to_string()).collect(),
                abi: self.abi,
                stamp: self.stamp,
            }))
        }
    }

    fn manifest() -> Arc<HostExportManifest> {
        let mut aggregator = HostDependencyAggregator::new(2);
        aggregator
            .register_library(LibraryEntry::new("core", vec!["core_alloc", "core_free"]))
            .unwrap();
        aggregator.finalize().unwrap()
    }

    fn loader(imports: Vec<&'static str>, abi: u32, stamp: u32) -> DynamicLoader {
        DynamicLoader::new(
            manifest(),
            Box::new(StubBackend {
                imports,
                abi,
                stamp,
            }),
        )
    }

    #[test]
    fn test_load_success() {
        let mut loader = loader(vec!["core_alloc"], ABI_VERSION, 2);
        let handle = loader.load(&PluginDescriptor::new("p", "/p.so")).unwrap();
        assert_eq!(handle.state(), PluginState::Loaded);
        assert!(loader.is_loaded("p"));
    }

    #[test]
    fn test_load_twice_rejected() {
        let mut loader = loader(vec![], ABI_VERSION, 2);
        let descriptor = PluginDescriptor::new("p", "/p.so");
        let _handle = loader.load(&descriptor).unwrap();

        let err = loader.load(&descriptor).unwrap_err();
        assert_eq!(
            err,
            LoadError::AlreadyLoaded {
                name: "p".to_string()
            }
        );
    }

    #[test]
    fn test_unresolved_import_leaves_nothing_loaded() {
        let mut loader = loader(vec!["core_alloc", "net_send"], ABI_VERSION, 2);
        let err = loader.load(&PluginDescriptor::new("p", "/p.so")).unwrap_err();
        assert_eq!(
            err,
            LoadError::SymbolUnresolved {
                plugin: "p".to_string(),
                symbol: "net_send".to_string()
            }
        );
        assert!(!loader.is_loaded("p"));
    }

    #[test]
    fn test_abi_mismatch() {
        let mut loader = loader(vec![], ABI_VERSION + 1, 2);
        let err = loader.load(&PluginDescriptor::new("p", "/p.so")).unwrap_err();
        assert!(matches!(err, LoadError::AbiMismatch { .. }));
    }

    #[test]
    fn test_manifest_stamp_mismatch() {
        let mut loader = loader(vec![], ABI_VERSION, 1);
        let err = loader.load(&PluginDescriptor::new("p", "/p.so")).unwrap_err();
        assert_eq!(
            err,
            LoadError::ManifestVersionMismatch {
                plugin: "p".to_string(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_unstamped_plugin_accepted() {
        let mut loader = loader(vec![], ABI_VERSION, UNSTAMPED);
        assert!(loader.load(&PluginDescriptor::new("p", "/p.so")).is_ok());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut loader = loader(vec![], ABI_VERSION, 2);
        let _handle = loader.load(&PluginDescriptor::new("p", "/p.so")).unwrap();
        assert!(loader.release("p"));
        assert!(!loader.release("p"));
        assert!(loader.load(&PluginDescriptor::new("p", "/p.so")).is_ok());
    }
}
