// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Symbol lookup in the running host image.

use crate::error::LinkError;
use std::collections::BTreeSet;
use std::ffi::c_void;

/// Answers whether a symbol is resolvable by modules loaded into this process.
pub trait SymbolResolver: Send + Sync {
    /// Whether `symbol` resolves.
    fn resolves(&self, symbol: &str) -> bool;
}

/// Resolver backed by the process's own global symbol table.
pub struct ProcessSymbols {
    #[cfg(unix)]
    image: libloading::os::unix::Library,
    #[cfg(windows)]
    image: libloading::os::windows::Library,
}

impl ProcessSymbols {
    /// Open the running executable image.
    pub fn open() -> Result<Self, LinkError> {
        #[cfg(unix)]
        {
            Ok(Self {
                image: libloading::os::unix::Library::this(),
            })
        }

        #[cfg(windows)]
        {
            let image = libloading::os::windows::Library::this().map_err(|e| {
                LinkError::HostImage {
                    message: e.to_string(),
                }
            })?;
            Ok(Self { image })
        }
    }
}

impl SymbolResolver for ProcessSymbols {
    fn resolves(&self, symbol: &str) -> bool {
        // SAFETY: the symbol is looked up as an opaque address and never called.
        unsafe { self.image.get::<*mut c_void>(symbol.as_bytes()).is_ok() }
    }
}

/// Resolver over a fixed symbol set.
#[derive(Debug, Clone, Default)]
pub struct StaticSymbols {
    symbols: BTreeSet<String>,
}

impl StaticSymbols {
    /// Create a resolver that knows exactly `symbols`.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

impl SymbolResolver for StaticSymbols {
    fn resolves(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }
}
