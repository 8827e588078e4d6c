// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Plugin ABI definitions.
//!
//! A plugin module exports a function named [`exports::ENTRY`] returning a
//! pointer to a static [`RawEntryTable`]. It may also export
//! [`exports::IMPORTS`], listing the host symbols it expects to resolve
//! against the export manifest.
//!
//! Entry points return `0` on success and any other value on failure.

use std::ffi::{c_char, CStr};

use crate::error::LoadError;

/// Plugin ABI version.
pub const ABI_VERSION: u32 = 1;

/// Manifest stamp of a plugin that was not built against a specific manifest.
pub const UNSTAMPED: u32 = 0;

/// Exported symbol names.
pub mod exports {
    /// Returns the entry-point table.
    pub const ENTRY: &str = "hostlink_plugin_entry";
    /// Returns the list of required host symbols.
    pub const IMPORTS: &str = "hostlink_plugin_imports";
}

/// `init(settings_json, len)`.
pub type InitFn = unsafe extern "C" fn(settings: *const u8, len: usize) -> i32;
/// `start()`.
pub type StartFn = unsafe extern "C" fn() -> i32;
/// `stop()`.
pub type StopFn = unsafe extern "C" fn() -> i32;

/// Signature of [`exports::ENTRY`].
pub type EntryFn = unsafe extern "C" fn() -> *const RawEntryTable;
/// Signature of [`exports::IMPORTS`]: writes the count, returns the array.
pub type ImportsFn = unsafe extern "C" fn(count: *mut usize) -> *const *const c_char;

/// Entry-point table exported by a plugin.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawEntryTable {
    /// Must equal [`ABI_VERSION`].
    pub abi_version: u32,
    /// Export manifest version the plugin was built against, or [`UNSTAMPED`].
    pub manifest_version: u32,
    /// Mandatory.
    pub init: Option<InitFn>,
    /// Optional.
    pub start: Option<StartFn>,
    /// Mandatory.
    pub stop: Option<StopFn>,
}

/// The callable part of a validated entry-point table.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedTable {
    pub init: InitFn,
    pub start: Option<StartFn>,
    pub stop: StopFn,
}

impl RawEntryTable {
    /// Check the table against this host's ABI.
    pub fn validate(&self, plugin: &str) -> Result<ValidatedTable, LoadError> {
        if self.abi_version != ABI_VERSION {
            return Err(LoadError::AbiMismatch {
                plugin: plugin.to_string(),
                message: format!(
                    "ABI version {} (host speaks {})",
                    self.abi_version, ABI_VERSION
                ),
            });
        }

        let init = self.init.ok_or_else(|| missing_entry(plugin, "initialize"))?;
        let stop = self.stop.ok_or_else(|| missing_entry(plugin, "stop"))?;

        Ok(ValidatedTable {
            init,
            start: self.start,
            stop,
        })
    }
}

fn missing_entry(plugin: &str, entry: &str) -> LoadError {
    LoadError::AbiMismatch {
        plugin: plugin.to_string(),
        message: format!("missing {} entry point", entry),
    }
}

/// Read the array returned by [`exports::IMPORTS`].
///
/// Null entries and invalid UTF-8 are skipped.
///
/// # Safety
/// `ptr` must be null or point to `count` pointers, each null or pointing
/// to a NUL-terminated string that stays valid for the call.
pub unsafe fn read_imports(ptr: *const *const c_char, count: usize) -> Vec<String> {
    if ptr.is_null() {
        return Vec::new();
    }

    std::slice::from_raw_parts(ptr, count)
        .iter()
        .filter(|p| !p.is_null())
        .filter_map(|p| CStr::from_ptr(*p).to_str().ok())
        .map(str::to_string)
        .collect()
}
