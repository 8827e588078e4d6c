// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Records of what happened to plugins.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::PluginState;

/// A state transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleEvent {
    pub plugin: String,
    pub from: PluginState,
    pub to: PluginState,
    pub at: DateTime<Utc>,
    pub detail: Option<String>,
}

/// A plugin that ended up `Failed`, with the state it failed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginFailure {
    pub plugin: String,
    pub stage: PluginState,
    pub message: String,
}

/// How unloading a plugin went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum DrainOutcome {
    /// The plugin never ran; released without a stop call.
    Released,
    /// `stop` returned success within the bound.
    Stopped,
    /// `stop` reported a failure.
    StopFailed(String),
    /// `stop` did not return within the bound; the module was force-unloaded.
    TimedOut,
}

impl DrainOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, DrainOutcome::Released | DrainOutcome::Stopped)
    }
}

/// Result of starting the configured plugins.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StartupReport {
    /// Plugins that reached `Running`, in start order.
    pub running: Vec<String>,
    /// Disabled plugins that were not touched.
    pub skipped: Vec<String>,
    /// Plugins excluded by a failure (best-effort policy).
    pub failed: Vec<PluginFailure>,
}

impl StartupReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of unloading every plugin.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShutdownReport {
    /// `(plugin, outcome)` in unload order.
    pub outcomes: Vec<(String, DrainOutcome)>,
}

impl ShutdownReport {
    /// Plugin names in the order they were unloaded.
    pub fn unload_order(&self) -> Vec<&str> {
        self.outcomes.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Plugins that did not stop within the drain bound.
    pub fn timed_out(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == DrainOutcome::TimedOut)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_clean())
    }
}
