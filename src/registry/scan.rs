// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Plugin directory scanning.

use std::path::Path;
use walkdir::WalkDir;

use crate::config::PluginEntry;
use crate::link::TargetFamily;

/// Find plugin modules directly inside `dir`.
///
/// Each module becomes an enabled entry named after its file stem, with a
/// leading `lib` stripped. Entries come back sorted by file name so a scan
/// is deterministic.
pub fn scan_directory(dir: &Path, family: TargetFamily) -> Vec<PluginEntry> {
    if !dir.is_dir() {
        tracing::debug!("Plugin directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let extension = family.module_extension();

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext == extension)
                .unwrap_or(false)
        })
        .filter_map(|entry| {
            let stem = entry.path().file_stem()?.to_string_lossy().to_string();
            let name = stem.strip_prefix("lib").unwrap_or(&stem).to_string();
            if name.is_empty() {
                return None;
            }
            Some(PluginEntry::new(name, entry.path()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_missing_dir() {
        assert!(scan_directory(Path::new("/nonexistent/plugins"), TargetFamily::Elf).is_empty());
    }

    #[test]
    fn test_scan_finds_modules_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("libzeta.so"), b"").unwrap();
        std::fs::write(dir.path().join("alpha.so"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::write(dir.path().join("libmac.dylib"), b"").unwrap();
        std::fs::create_dir(dir.path().join("nested.so")).unwrap();

        let found = scan_directory(dir.path(), TargetFamily::Elf);
        let names: Vec<_> = found.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(found.iter().all(|e| e.enabled));
    }

    #[test]
    fn test_scan_macho_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("libmac.dylib"), b"").unwrap();
        std::fs::write(dir.path().join("libelf.so"), b"").unwrap();

        let found = scan_directory(dir.path(), TargetFamily::MachO);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "mac");
    }
}
