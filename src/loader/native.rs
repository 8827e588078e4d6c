// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Native module backend built on `libloading`.

use lazy_static::lazy_static;
use libloading::{Library, Symbol};
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use super::abi::{self, EntryFn, ImportsFn, InitFn, StartFn, StopFn};
use super::module::{BoundEntryPoints, EntryPoints, ModuleBackend, PluginModule};
use crate::error::LoadError;
use crate::registry::PluginDescriptor;

lazy_static! {
    // (pattern, strip Mach-O underscore)
    static ref UNRESOLVED_PATTERNS: Vec<(Regex, bool)> = vec![
        (Regex::new(r"undefined symbol:\s*([^\s,()]+)").unwrap(), false),
        (Regex::new(r"Symbol not found:\s*([^\s,()]+)").unwrap(), true),
        (Regex::new(r"Symbol (\S+) \(number \d+\) is not exported").unwrap(), false),
        // musl
        (Regex::new(r"Error relocating [^:]+: ([^\s:]+): symbol not found").unwrap(), false),
        // FreeBSD rtld
        (Regex::new(r#"Undefined symbol "([^"]+)""#).unwrap(), false),
        // Solaris and illumos ld.so.1
        (Regex::new(r"symbol (\S+): referenced symbol not found").unwrap(), false),
    ];
}

/// Opens plugin modules with the platform loader, binding eagerly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleBackend for NativeBackend {
    fn open(&self, descriptor: &PluginDescriptor) -> Result<Box<dyn PluginModule>, LoadError> {
        let library = open_eager(&descriptor.path)
            .map_err(|e| classify_open_error(&descriptor.name, &e.to_string()))?;

        tracing::debug!(
            "Opened module for plugin '{}' at {}",
            descriptor.name,
            descriptor.path.display()
        );

        Ok(Box::new(NativeModule {
            name: descriptor.name.clone(),
            library: Arc::new(library),
        }))
    }
}

#[cfg(unix)]
fn open_eager(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};

    // SAFETY: loading runs the module's initializers; plugins are trusted
    // code supplied by the installation.
    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_LOCAL) }.map(Library::from)
}

#[cfg(not(unix))]
fn open_eager(path: &Path) -> Result<Library, libloading::Error> {
    // SAFETY: as above.
    unsafe { Library::new(path) }
}

/// Map a platform loader message to a load error.
///
/// Messages naming an unresolved symbol become [`LoadError::SymbolUnresolved`].
pub fn classify_open_error(plugin: &str, message: &str) -> LoadError {
    for (pattern, strip_underscore) in UNRESOLVED_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(message) {
            let symbol = &caps[1];
            let symbol = if *strip_underscore {
                symbol.strip_prefix('_').unwrap_or(symbol)
            } else {
                symbol
            };
            return LoadError::SymbolUnresolved {
                plugin: plugin.to_string(),
                symbol: symbol.to_string(),
            };
        }
    }

    LoadError::OpenFailed {
        plugin: plugin.to_string(),
        message: message.trim().to_string(),
    }
}

struct NativeModule {
    name: String,
    library: Arc<Library>,
}

impl PluginModule for NativeModule {
    fn imports(&self) -> Vec<String> {
        // SAFETY: the symbol is declared by the plugin ABI with this signature.
        let imports: Symbol<ImportsFn> =
            match unsafe { self.library.get(abi::exports::IMPORTS.as_bytes()) } {
                Ok(symbol) => symbol,
                Err(_) => return Vec::new(),
            };

        let mut count = 0usize;
        // SAFETY: the ABI requires the returned array to hold `count` entries
        // of static lifetime.
        unsafe {
            let ptr = imports(&mut count);
            abi::read_imports(ptr, count)
        }
    }

    fn bind(&self) -> Result<BoundEntryPoints, LoadError> {
        // SAFETY: as for imports.
        let entry: Symbol<EntryFn> = unsafe { self.library.get(abi::exports::ENTRY.as_bytes()) }
            .map_err(|_| LoadError::AbiMismatch {
                plugin: self.name.clone(),
                message: format!("missing {} export", abi::exports::ENTRY),
            })?;

        // SAFETY: the entry function takes no arguments and returns a pointer
        // to a static table or null.
        let raw = unsafe {
            let ptr = entry();
            if ptr.is_null() {
                return Err(LoadError::AbiMismatch {
                    plugin: self.name.clone(),
                    message: "entry table is null".to_string(),
                });
            }
            *ptr
        };

        let table = raw.validate(&self.name)?;

        Ok(BoundEntryPoints {
            abi_version: raw.abi_version,
            manifest_version: raw.manifest_version,
            calls: Box::new(NativeEntryPoints {
                init: table.init,
                start: table.start,
                stop: table.stop,
                _library: Arc::clone(&self.library),
            }),
        })
    }
}

/// Function pointers into a plugin module.
///
/// Holds a reference on the library so the code stays mapped while any
/// call through these pointers can still be in flight.
struct NativeEntryPoints {
    init: InitFn,
    start: Option<StartFn>,
    stop: StopFn,
    _library: Arc<Library>,
}

fn status(entry: &str, code: i32) -> Result<(), String> {
    if code == 0 {
        Ok(())
    } else {
        Err(format!("{} returned status {}", entry, code))
    }
}

impl EntryPoints for NativeEntryPoints {
    fn initialize(&mut self, settings: &Value) -> Result<(), String> {
        let payload = serde_json::to_vec(settings).map_err(|e| e.to_string())?;
        // SAFETY: the pointer/length pair is valid for the duration of the call.
        let code = unsafe { (self.init)(payload.as_ptr(), payload.len()) };
        status("initialize", code)
    }

    fn start(&mut self) -> Result<(), String> {
        match self.start {
            // SAFETY: entry point validated at bind time.
            Some(start) => status("start", unsafe { start() }),
            None => Ok(()),
        }
    }

    fn stop(&mut self) -> Result<(), String> {
        // SAFETY: entry point validated at bind time.
        status("stop", unsafe { (self.stop)() })
    }
}
