// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Plugin lifecycle.
//!
//! `Discovered -> Loaded -> Initialized -> Running -> Draining -> Unloaded`,
//! with `Failed` reachable from every non-terminal state.

mod handle;
mod manager;
mod report;
mod state;

pub use handle::PluginHandle;
pub use manager::{LifecycleManager, LifecycleOptions};
pub use report::{DrainOutcome, LifecycleEvent, PluginFailure, ShutdownReport, StartupReport};
pub use state::{PluginState, StartupPolicy};
