// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Plugin module compiled by the native loader tests.
//!
//! Variants are selected with `--cfg`: `no_entry`, `null_table`,
//! `abi_two` and `unresolved`.

use std::os::raw::c_char;
use std::sync::atomic::{AtomicBool, Ordering};

type InitFn = unsafe extern "C" fn(*const u8, usize) -> i32;
type CallFn = unsafe extern "C" fn() -> i32;

#[repr(C)]
pub struct EntryTable {
    abi_version: u32,
    manifest_version: u32,
    init: Option<InitFn>,
    start: Option<CallFn>,
    stop: Option<CallFn>,
}

#[cfg(not(abi_two))]
const ABI_VERSION: u32 = 1;
#[cfg(abi_two)]
const ABI_VERSION: u32 = 2;

static STARTED: AtomicBool = AtomicBool::new(false);

// Status 3 when the settings carry no "greeting" key.
unsafe extern "C" fn init(settings: *const u8, len: usize) -> i32 {
    let settings = std::slice::from_raw_parts(settings, len);
    if settings.windows(10).any(|w| w == b"\"greeting\"") {
        0
    } else {
        3
    }
}

unsafe extern "C" fn start() -> i32 {
    STARTED.store(true, Ordering::SeqCst);
    0
}

// Status 5 unless start ran first.
unsafe extern "C" fn stop() -> i32 {
    if STARTED.swap(false, Ordering::SeqCst) {
        0
    } else {
        5
    }
}

static TABLE: EntryTable = EntryTable {
    abi_version: ABI_VERSION,
    manifest_version: 1,
    init: Some(init),
    start: Some(start),
    stop: Some(stop),
};

#[cfg(not(no_entry))]
#[no_mangle]
pub extern "C" fn hostlink_plugin_entry() -> *const EntryTable {
    if cfg!(null_table) {
        std::ptr::null()
    } else {
        &TABLE
    }
}

struct Imports([*const c_char; 1]);

unsafe impl Sync for Imports {}

static IMPORTS: Imports = Imports(["core_alloc\0".as_ptr() as *const c_char]);

#[no_mangle]
pub unsafe extern "C" fn hostlink_plugin_imports(count: *mut usize) -> *const *const c_char {
    *count = IMPORTS.0.len();
    IMPORTS.0.as_ptr()
}

#[cfg(unresolved)]
extern "C" {
    fn hostlink_fixture_absent() -> i32;
}

#[cfg(unresolved)]
#[no_mangle]
pub extern "C" fn hostlink_fixture_touch() -> i32 {
    unsafe { hostlink_fixture_absent() }
}
