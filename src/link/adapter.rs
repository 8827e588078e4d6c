// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Export surface preparation.

use crate::error::LinkError;
use crate::manifest::HostExportManifest;
use std::path::{Path, PathBuf};

use super::resolver::SymbolResolver;
use super::strategy::LinkStrategy;

/// Establishes that every manifest symbol is visible to future plugin loads.
pub trait PlatformLinkAdapter {
    /// The strategy this adapter realizes.
    fn strategy(&self) -> &LinkStrategy;

    /// Prepare (and verify) the export surface. Called once, before any load.
    fn prepare_export_surface(&self, manifest: &HostExportManifest) -> Result<(), LinkError>;
}

/// Adapter for the platform the host was built for.
///
/// The linker already did the exporting at build time (see `build.rs`);
/// at startup the adapter checks the result against the manifest by probing
/// the host image for every promised symbol.
pub struct NativeLinkAdapter {
    strategy: LinkStrategy,
    resolver: Box<dyn SymbolResolver>,
}

impl NativeLinkAdapter {
    /// Create an adapter from a strategy and a symbol resolver.
    pub fn new(strategy: LinkStrategy, resolver: Box<dyn SymbolResolver>) -> Self {
        Self { strategy, resolver }
    }
}

impl PlatformLinkAdapter for NativeLinkAdapter {
    fn strategy(&self) -> &LinkStrategy {
        &self.strategy
    }

    fn prepare_export_surface(&self, manifest: &HostExportManifest) -> Result<(), LinkError> {
        if let LinkStrategy::PreLink { object } = &self.strategy {
            if manifest.archives().next().is_some() && !object.exists() {
                return Err(LinkError::PrelinkOutputMissing {
                    path: object.clone(),
                });
            }
        }

        let missing: Vec<String> = manifest
            .symbols()
            .filter(|sym| !self.resolver.resolves(sym))
            .map(str::to_string)
            .collect();

        if !missing.is_empty() {
            return Err(LinkError::MissingExports {
                strategy: self.strategy.name().to_string(),
                symbols: missing,
            });
        }

        tracing::info!(
            strategy = %self.strategy,
            symbols = manifest.symbol_count(),
            "Export surface verified"
        );
        Ok(())
    }
}

/// Expand the manifest's archive patterns into concrete archive paths.
///
/// Relative patterns are resolved against `base_dir`. Every pattern must
/// match at least one file.
pub fn resolve_archives(
    manifest: &HostExportManifest,
    base_dir: &Path,
) -> Result<Vec<PathBuf>, LinkError> {
    let mut archives = Vec::new();

    for (library, pattern) in manifest.archives() {
        let full = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            base_dir.join(pattern)
        };
        let full_pattern = full.to_string_lossy();

        let paths = glob::glob(&full_pattern).map_err(|e| LinkError::InvalidArchivePattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let before = archives.len();
        for path in paths.flatten() {
            if !archives.contains(&path) {
                archives.push(path);
            }
        }

        if archives.len() == before {
            return Err(LinkError::ArchiveNotFound {
                library: library.to_string(),
                pattern: pattern.to_string(),
            });
        }
    }

    Ok(archives)
}
