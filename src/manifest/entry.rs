// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Manifest entries and the finalized export manifest.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

lazy_static! {
    /// Accepted symbol spellings: C identifiers, optionally qualified with `::`.
    static ref SYMBOL_REGEX: Regex =
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$.]*(::[A-Za-z_$][A-Za-z0-9_$.]*)*$").unwrap();
}

/// Check whether a symbol name can appear in the export manifest.
pub fn is_valid_symbol(symbol: &str) -> bool {
    SYMBOL_REGEX.is_match(symbol)
}

/// A statically linked library the host exports to plugins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Library name (e.g. `libcore`).
    pub name: String,

    /// Static archive backing the library, if the link step consumes one.
    /// May be a glob pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,

    /// Symbols the host guarantees to plugins.
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl LibraryEntry {
    /// Create an entry with no archive.
    pub fn new<I, S>(name: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            archive: None,
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach the static archive backing this library.
    pub fn with_archive(mut self, archive: impl Into<String>) -> Self {
        self.archive = Some(archive.into());
        self
    }
}

/// The frozen set of libraries and symbols the host exports.
///
/// Only [`HostDependencyAggregator::finalize`](super::HostDependencyAggregator::finalize)
/// constructs one, and it has no mutating methods: the symbol set can never
/// shrink for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostExportManifest {
    version: u32,
    libraries: Vec<LibraryEntry>,
    #[serde(skip)]
    owners: BTreeMap<String, String>,
}

impl HostExportManifest {
    pub(super) fn new(version: u32, libraries: Vec<LibraryEntry>) -> Self {
        let owners = libraries
            .iter()
            .flat_map(|lib| {
                lib.symbols
                    .iter()
                    .map(move |sym| (sym.clone(), lib.name.clone()))
            })
            .collect();

        Self {
            version,
            libraries,
            owners,
        }
    }

    /// Manifest version stamp bound into the plugin ABI.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Exported libraries in registration order.
    pub fn libraries(&self) -> &[LibraryEntry] {
        &self.libraries
    }

    /// Whether a library is exported by the host.
    pub fn has_library(&self, name: &str) -> bool {
        self.libraries.iter().any(|lib| lib.name == name)
    }

    /// Whether a symbol is guaranteed to be resolvable.
    pub fn contains_symbol(&self, symbol: &str) -> bool {
        self.owners.contains_key(symbol)
    }

    /// The library that exports a symbol.
    pub fn owner_of(&self, symbol: &str) -> Option<&str> {
        self.owners.get(symbol).map(String::as_str)
    }

    /// All exported symbols, sorted.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.owners.keys().map(String::as_str)
    }

    /// Number of exported symbols.
    pub fn symbol_count(&self) -> usize {
        self.owners.len()
    }

    /// Archive patterns backing the exported libraries, with their library name.
    pub fn archives(&self) -> impl Iterator<Item = (&str, &str)> {
        self.libraries
            .iter()
            .filter_map(|lib| lib.archive.as_deref().map(|a| (lib.name.as_str(), a)))
    }

    /// Return the required symbols the manifest does not export, in input order.
    pub fn missing<'a, I>(&self, required: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        required
            .into_iter()
            .filter(|sym| !self.contains_symbol(sym))
            .collect()
    }
}
