// Author: Eshan Roy
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};

use super::state::PluginState;
use crate::loader::{EntryPoints, PluginModule};
use crate::registry::PluginDescriptor;

/// A loaded plugin.
///
/// Created by the dynamic loader, mutated only by the lifecycle manager.
/// Entry points are declared before the module so they are dropped first.
pub struct PluginHandle {
    descriptor: PluginDescriptor,
    state: PluginState,
    entry: Option<Box<dyn EntryPoints>>,
    module: Option<Box<dyn PluginModule>>,
    loaded_at: DateTime<Utc>,
}

impl PluginHandle {
    pub(crate) fn new(
        descriptor: PluginDescriptor,
        module: Box<dyn PluginModule>,
        entry: Box<dyn EntryPoints>,
    ) -> Self {
        Self {
            descriptor,
            state: PluginState::Loaded,
            entry: Some(entry),
            module: Some(module),
            loaded_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Whether the native module is still held.
    pub fn has_module(&self) -> bool {
        self.module.is_some()
    }

    pub(crate) fn set_state(&mut self, state: PluginState) {
        self.state = state;
    }

    pub(crate) fn entry_mut(&mut self) -> Option<&mut (dyn EntryPoints + 'static)> {
        self.entry.as_deref_mut()
    }

    /// Hand the entry points to a drain thread.
    pub(crate) fn take_entry(&mut self) -> Option<Box<dyn EntryPoints>> {
        self.entry.take()
    }

    /// Drop entry points, then the module.
    pub(crate) fn release(&mut self) {
        self.entry = None;
        self.module = None;
    }
}

impl std::fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHandle")
            .field("name", &self.descriptor.name)
            .field("state", &self.state)
            .field("loaded_at", &self.loaded_at)
            .finish_non_exhaustive()
    }
}
