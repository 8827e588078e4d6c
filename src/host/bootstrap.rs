// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Sequential host startup.
//!
//! manifest -> export surface -> registry -> load/initialize/start.
//! Each step completes before the next begins; no plugin is touched until
//! the export surface has been verified.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{HostConfig, PluginEntry};
use crate::error::{HostError, LinkError, ManifestError, Result};
use crate::lifecycle::{
    LifecycleManager, LifecycleOptions, PluginState, ShutdownReport, StartupReport,
};
use crate::link::{
    LinkStrategy, NativeLinkAdapter, PlatformLinkAdapter, ProcessSymbols, TargetFamily,
    PRELINK_OBJECT_NAME,
};
use crate::loader::{DynamicLoader, ModuleBackend};
use crate::manifest::{HostDependencyAggregator, HostExportManifest};
use crate::registry::{scan_directory, PluginRegistry, RuntimeLayout};

/// Configured plugin entries, with scanned ones appended when scanning is on.
pub fn plugin_entries(config: &HostConfig) -> Vec<PluginEntry> {
    let declared = &config.plugins.entries;

    match (&config.plugins.directory, config.plugins.scan) {
        (Some(dir), true) => {
            let family = TargetFamily::current().unwrap_or(TargetFamily::Elf);
            let scanned = scan_directory(&config.resolve_path(dir), family);
            PluginRegistry::merge_scanned(declared, scanned)
        }
        _ => declared.clone(),
    }
}

/// Build and freeze the export manifest.
///
/// Plugin-linked libraries are declared first so a library claimed by both
/// sides is rejected whichever way round it was configured.
pub fn build_manifest(
    config: &HostConfig,
    entries: &[PluginEntry],
) -> std::result::Result<Arc<HostExportManifest>, ManifestError> {
    let mut aggregator = HostDependencyAggregator::new(config.exports.version);

    for entry in entries.iter().filter(|e| !e.links.is_empty()) {
        aggregator.declare_plugin_dependencies(&entry.name, &entry.links)?;
    }

    for library in &config.exports.libraries {
        aggregator.register_library(library.clone())?;
    }

    aggregator.finalize()
}

/// Path of the pre-link object for this configuration.
pub fn prelink_object(config: &HostConfig) -> PathBuf {
    match &config.link.prelink_object {
        Some(path) => config.resolve_path(path),
        None => config.base_dir().join(PRELINK_OBJECT_NAME),
    }
}

/// The link strategy of the running platform.
pub fn current_strategy(config: &HostConfig) -> Result<LinkStrategy> {
    let family = TargetFamily::current().ok_or_else(|| LinkError::UnsupportedPlatform {
        target: std::env::consts::OS.to_string(),
    })?;
    Ok(LinkStrategy::for_family(family, &prelink_object(config)))
}

/// Adapter that verifies the export surface against the running process.
pub fn native_adapter(config: &HostConfig) -> Result<NativeLinkAdapter> {
    let strategy = current_strategy(config)?;
    let resolver = ProcessSymbols::open()?;
    Ok(NativeLinkAdapter::new(strategy, Box::new(resolver)))
}

/// Outcome of the load-free startup steps.
#[derive(Debug)]
pub struct Preflight {
    pub manifest: Arc<HostExportManifest>,
    pub registry: PluginRegistry,
}

impl Preflight {
    /// Build the manifest, prepare the export surface and discover plugins.
    pub fn run(
        config: &HostConfig,
        layout: &RuntimeLayout,
        adapter: &dyn PlatformLinkAdapter,
    ) -> Result<Self> {
        let entries = plugin_entries(config);

        let manifest = build_manifest(config, &entries)?;
        tracing::info!(
            version = manifest.version(),
            libraries = manifest.libraries().len(),
            symbols = manifest.symbol_count(),
            "Export manifest finalized"
        );

        adapter
            .prepare_export_surface(&manifest)
            .map_err(HostError::from)?;

        let registry = PluginRegistry::discover(&entries, layout)?;

        Ok(Self { manifest, registry })
    }
}

/// A started host.
pub struct Host {
    manifest: Arc<HostExportManifest>,
    registry: PluginRegistry,
    lifecycle: LifecycleManager,
    startup: StartupReport,
}

impl Host {
    /// Run the full startup sequence.
    pub fn bootstrap(
        config: &HostConfig,
        layout: &RuntimeLayout,
        adapter: &dyn PlatformLinkAdapter,
        backend: Box<dyn ModuleBackend>,
    ) -> Result<Self> {
        let Preflight { manifest, registry } = Preflight::run(config, layout, adapter)?;

        let options = LifecycleOptions {
            policy: config.host.startup_policy,
            drain_timeout: config.host.drain_timeout(),
        };
        tracing::debug!(
            "Starting {} plugin(s) with {} policy",
            registry.enabled().count(),
            options.policy
        );

        let loader = DynamicLoader::new(Arc::clone(&manifest), backend);
        let mut lifecycle = LifecycleManager::new(loader, options);
        let startup = lifecycle.start_all(registry.descriptors())?;

        Ok(Self {
            manifest,
            registry,
            lifecycle,
            startup,
        })
    }

    pub fn manifest(&self) -> &Arc<HostExportManifest> {
        &self.manifest
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn startup_report(&self) -> &StartupReport {
        &self.startup
    }

    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.lifecycle.state(name)
    }

    /// Drain and unload every plugin, last loaded first.
    pub fn shutdown(mut self) -> ShutdownReport {
        tracing::info!("Shutting down {} plugin(s)", self.lifecycle.handles().len());
        self.lifecycle.shutdown()
    }
}
