// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Dynamic loading of plugin modules.

pub mod abi;
mod dynamic;
mod module;
mod native;

pub use dynamic::DynamicLoader;
pub use module::{BoundEntryPoints, EntryPoints, ModuleBackend, PluginModule};
pub use native::{classify_open_error, NativeBackend};
