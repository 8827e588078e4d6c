// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Plugin states and the startup policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Discovered,
    Loaded,
    Initialized,
    Running,
    Draining,
    Unloaded,
    Failed,
}

impl PluginState {
    /// Whether the state machine permits `self -> next`.
    ///
    /// Plugins that never reached `Running` may go straight to `Unloaded`.
    pub fn can_transition_to(self, next: PluginState) -> bool {
        use PluginState::*;

        if next == Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Discovered, Loaded)
                | (Loaded, Initialized)
                | (Loaded, Unloaded)
                | (Initialized, Running)
                | (Initialized, Unloaded)
                | (Running, Draining)
                | (Draining, Unloaded)
        )
    }

    /// `Unloaded` and `Failed` have no way out.
    pub fn is_terminal(self) -> bool {
        matches!(self, PluginState::Unloaded | PluginState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PluginState::Discovered => "discovered",
            PluginState::Loaded => "loaded",
            PluginState::Initialized => "initialized",
            PluginState::Running => "running",
            PluginState::Draining => "draining",
            PluginState::Unloaded => "unloaded",
            PluginState::Failed => "failed",
        }
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a plugin failure during startup does to the rest of startup.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum StartupPolicy {
    /// Drain what is running and abort startup.
    #[default]
    Fatal,
    /// Skip the failed plugin and continue.
    BestEffort,
}

impl fmt::Display for StartupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupPolicy::Fatal => write!(f, "fatal"),
            StartupPolicy::BestEffort => write!(f, "best-effort"),
        }
    }
}
