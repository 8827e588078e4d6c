// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Pre-link pass for loaders that cannot retain whole archives.
//!
//! The pass merges every exported archive into one relocatable object with
//! full symbol export. It runs in two phases: an empty placeholder keeps
//! the host link step from failing on a missing input during the first
//! build, then the real merge overwrites it before the host is linked.

use crate::error::LinkError;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::strategy::LinkStrategy;

/// The merge step of a [`LinkStrategy::PreLink`] strategy.
#[derive(Debug, Clone)]
pub struct PrelinkPass {
    strategy: LinkStrategy,
    object: PathBuf,
    archives: Vec<PathBuf>,
}

impl PrelinkPass {
    /// Build the pass for a strategy. Returns `None` for single-phase strategies.
    pub fn new(strategy: &LinkStrategy, archives: Vec<PathBuf>) -> Option<Self> {
        match strategy {
            LinkStrategy::PreLink { object } => Some(Self {
                strategy: strategy.clone(),
                object: object.clone(),
                archives,
            }),
            _ => None,
        }
    }

    /// Path of the merged object.
    pub fn object(&self) -> &Path {
        &self.object
    }

    /// Create an empty placeholder object if none exists yet.
    ///
    /// Returns `true` if a placeholder was written.
    pub fn ensure_placeholder(&self) -> Result<bool, LinkError> {
        if self.object.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.object.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LinkError::PrelinkFailed {
                message: format!("Failed to create {}: {}", parent.display(), e),
            })?;
        }

        std::fs::write(&self.object, b"").map_err(|e| LinkError::PrelinkFailed {
            message: format!("Failed to write placeholder {}: {}", self.object.display(), e),
        })?;

        tracing::debug!("Wrote pre-link placeholder {}", self.object.display());
        Ok(true)
    }

    /// The linker command for the merge, if there is anything to merge.
    pub fn command(&self) -> Option<Command> {
        let invocation = self.strategy.prelink_invocation(&self.archives)?;
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        Some(command)
    }

    /// Run both phases: placeholder, then merge.
    pub fn run(&self) -> Result<(), LinkError> {
        self.ensure_placeholder()?;

        let Some(mut command) = self.command() else {
            tracing::debug!("No archives to pre-link; keeping placeholder");
            return Ok(());
        };

        tracing::info!(
            "Pre-linking {} archive(s) into {}",
            self.archives.len(),
            self.object.display()
        );

        let output = command.output().map_err(|e| LinkError::PrelinkFailed {
            message: format!("Failed to run linker: {}", e),
        })?;

        if !output.status.success() {
            return Err(LinkError::PrelinkFailed {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !self.object.exists() {
            return Err(LinkError::PrelinkOutputMissing {
                path: self.object.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_single_phase_has_no_pass() {
        let strategy = LinkStrategy::ForcedLoad;
        assert!(PrelinkPass::new(&strategy, vec![PathBuf::from("a.a")]).is_none());
    }

    #[test]
    fn test_placeholder_created_once() {
        let dir = TempDir::new().unwrap();
        let object = dir.path().join("nested").join("merged.o");
        let strategy = LinkStrategy::PreLink {
            object: object.clone(),
        };
        let pass = PrelinkPass::new(&strategy, Vec::new()).unwrap();

        assert!(pass.ensure_placeholder().unwrap());
        assert!(object.exists());
        assert_eq!(std::fs::metadata(&object).unwrap().len(), 0);
        assert!(!pass.ensure_placeholder().unwrap());
    }

    #[test]
    fn test_run_without_archives_keeps_placeholder() {
        let dir = TempDir::new().unwrap();
        let object = dir.path().join("merged.o");
        let strategy = LinkStrategy::PreLink {
            object: object.clone(),
        };
        let pass = PrelinkPass::new(&strategy, Vec::new()).unwrap();

        assert!(pass.command().is_none());
        pass.run().unwrap();
        assert!(object.exists());
    }

    #[test]
    fn test_command_targets_object() {
        let strategy = LinkStrategy::PreLink {
            object: PathBuf::from("out/merged.o"),
        };
        let pass = PrelinkPass::new(&strategy, vec![PathBuf::from("liba.a")]).unwrap();
        let command = pass.command().unwrap();

        assert_eq!(command.get_program(), "ld");
        let args: Vec<_> = command
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert!(args.contains(&"out/merged.o".to_string()));
        assert!(args.contains(&"liba.a".to_string()));
    }
}
