// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Per-platform "export everything" link strategies.
//!
//! This file depends on `std` only: `build.rs` includes it with `#[path]`
//! so the build-time linker arguments and the runtime view of the strategy
//! come from the same definition.

use std::fmt;
use std::path::{Path, PathBuf};

/// Default file name of the merged object produced by the pre-link pass.
pub const PRELINK_OBJECT_NAME: &str = "hostlink-exports.o";

/// Platform families whose native loaders need different link treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFamily {
    /// ELF targets with GNU-compatible linkers.
    Elf,
    /// Solaris and illumos.
    Solaris,
    /// Apple Mach-O targets.
    MachO,
    /// AIX, whose loader cannot retain every member of an arbitrary archive.
    Aix,
}

impl TargetFamily {
    /// Map a `target_os` value onto a family.
    pub fn from_target_os(os: &str) -> Option<Self> {
        match os {
            "linux" | "android" | "freebsd" | "netbsd" | "openbsd" | "dragonfly" | "hurd"
            | "fuchsia" => Some(TargetFamily::Elf),
            "solaris" | "illumos" => Some(TargetFamily::Solaris),
            "macos" | "ios" | "tvos" | "watchos" | "visionos" => Some(TargetFamily::MachO),
            "aix" => Some(TargetFamily::Aix),
            _ => None,
        }
    }

    /// The family of the platform this binary was compiled for.
    pub fn current() -> Option<Self> {
        Self::from_target_os(std::env::consts::OS)
    }

    /// File extension of plugin modules on this family.
    pub fn module_extension(&self) -> &'static str {
        match self {
            TargetFamily::MachO => "dylib",
            TargetFamily::Elf | TargetFamily::Solaris | TargetFamily::Aix => "so",
        }
    }
}

/// How an archive-retention linker spells "keep every member".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetentionFlavor {
    /// `--whole-archive` / `--no-whole-archive`.
    Gnu,
    /// `-z allextract` / `-z defaultextract`.
    Solaris,
}

/// A linker invocation run outside the host's own link step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
}

/// How the host makes every aggregated symbol visible to later loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkStrategy {
    /// Tell the linker to keep every archive member.
    ArchiveRetention { flavor: RetentionFlavor },
    /// Force-load every member of every archive.
    ForcedLoad,
    /// Merge the archives into one relocatable object with full export,
    /// then link that object into the host.
    PreLink { object: PathBuf },
}

impl LinkStrategy {
    /// Select the strategy for a platform family.
    pub fn for_family(family: TargetFamily, prelink_object: &Path) -> Self {
        match family {
            TargetFamily::Elf => LinkStrategy::ArchiveRetention {
                flavor: RetentionFlavor::Gnu,
            },
            TargetFamily::Solaris => LinkStrategy::ArchiveRetention {
                flavor: RetentionFlavor::Solaris,
            },
            TargetFamily::MachO => LinkStrategy::ForcedLoad,
            TargetFamily::Aix => LinkStrategy::PreLink {
                object: prelink_object.to_path_buf(),
            },
        }
    }

    /// Short name used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            LinkStrategy::ArchiveRetention { .. } => "archive-retention",
            LinkStrategy::ForcedLoad => "forced-load",
            LinkStrategy::PreLink { .. } => "pre-link",
        }
    }

    /// Whether the strategy needs a separate merge step before the host link.
    pub fn is_two_phase(&self) -> bool {
        matches!(self, LinkStrategy::PreLink { .. })
    }

    /// Compiler-driver arguments for the host link step.
    ///
    /// Returns nothing when there are no archives to export.
    pub fn host_link_args(&self, archives: &[PathBuf]) -> Vec<String> {
        if archives.is_empty() {
            return Vec::new();
        }

        let mut args = Vec::new();
        match self {
            LinkStrategy::ArchiveRetention {
                flavor: RetentionFlavor::Gnu,
            } => {
                args.push("-Wl,--export-dynamic".to_string());
                args.push("-Wl,--whole-archive".to_string());
                args.extend(archives.iter().map(|a| a.display().to_string()));
                args.push("-Wl,--no-whole-archive".to_string());
            }
            LinkStrategy::ArchiveRetention {
                flavor: RetentionFlavor::Solaris,
            } => {
                args.push("-Wl,-z,allextract".to_string());
                args.extend(archives.iter().map(|a| a.display().to_string()));
                args.push("-Wl,-z,defaultextract".to_string());
            }
            LinkStrategy::ForcedLoad => {
                args.push("-Wl,-export_dynamic".to_string());
                args.extend(
                    archives
                        .iter()
                        .map(|a| format!("-Wl,-force_load,{}", a.display())),
                );
            }
            LinkStrategy::PreLink { object } => {
                // The archives went into the merged object; the host sees only it.
                args.push("-Wl,-brtl".to_string());
                args.push("-Wl,-bexpfull".to_string());
                args.push(object.display().to_string());
            }
        }
        args
    }

    /// The merge step of a two-phase strategy.
    pub fn prelink_invocation(&self, archives: &[PathBuf]) -> Option<Invocation> {
        match self {
            LinkStrategy::PreLink { object } if !archives.is_empty() => {
                let mut args = vec![
                    "-r".to_string(),
                    "-bexpfull".to_string(),
                    "-bnogc".to_string(),
                    "-o".to_string(),
                    object.display().to_string(),
                ];
                args.extend(archives.iter().map(|a| a.display().to_string()));
                Some(Invocation {
                    program: "ld".to_string(),
                    args,
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for LinkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStrategy::ArchiveRetention { flavor } => {
                write!(f, "{} ({:?})", self.name(), flavor)
            }
            LinkStrategy::ForcedLoad => write!(f, "{}", self.name()),
            LinkStrategy::PreLink { object } => {
                write!(f, "{} ({})", self.name(), object.display())
            }
        }
    }
}
