// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Plugin lifecycle manager.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use super::handle::PluginHandle;
use super::report::{DrainOutcome, LifecycleEvent, PluginFailure, ShutdownReport, StartupReport};
use super::state::{PluginState, StartupPolicy};
use crate::error::{HostError, LifecycleError, LoadError};
use crate::loader::{DynamicLoader, EntryPoints};
use crate::registry::PluginDescriptor;

/// Startup policy and drain bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleOptions {
    pub policy: StartupPolicy,
    pub drain_timeout: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            policy: StartupPolicy::Fatal,
            drain_timeout: Duration::from_millis(5000),
        }
    }
}

/// Drives loaded plugins through their states.
///
/// All load and unload operations go through `&mut self`; there is one
/// owner of the plugin set.
pub struct LifecycleManager {
    loader: DynamicLoader,
    options: LifecycleOptions,
    handles: Vec<PluginHandle>,
    states: HashMap<String, PluginState>,
    load_order: Vec<String>,
    events: Vec<LifecycleEvent>,
    failures: Vec<PluginFailure>,
}

impl LifecycleManager {
    pub fn new(loader: DynamicLoader, options: LifecycleOptions) -> Self {
        Self {
            loader,
            options,
            handles: Vec::new(),
            states: HashMap::new(),
            load_order: Vec::new(),
            events: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn loader(&self) -> &DynamicLoader {
        &self.loader
    }

    pub fn options(&self) -> LifecycleOptions {
        self.options
    }

    /// Current state of a plugin the manager has seen.
    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.states.get(name).copied()
    }

    /// Names of loaded plugins, in the order they were loaded.
    pub fn load_order(&self) -> &[String] {
        &self.load_order
    }

    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    pub fn failures(&self) -> &[PluginFailure] {
        &self.failures
    }

    /// Live handles, in load order.
    pub fn handles(&self) -> &[PluginHandle] {
        &self.handles
    }

    /// Names of running plugins, in load order.
    pub fn running(&self) -> Vec<&str> {
        self.handles
            .iter()
            .filter(|h| h.state() == PluginState::Running)
            .map(|h| h.name())
            .collect()
    }

    /// `Discovered -> Loaded`.
    pub fn load(&mut self, descriptor: &PluginDescriptor) -> Result<(), LoadError> {
        let name = descriptor.name.clone();

        match self.loader.load(descriptor) {
            Ok(handle) => {
                self.states.insert(name.clone(), PluginState::Discovered);
                self.handles.push(handle);
                self.load_order.push(name.clone());
                self.record(&name, PluginState::Loaded, None);
                Ok(())
            }
            Err(err @ LoadError::AlreadyLoaded { .. }) => {
                // The live instance is unaffected.
                tracing::error!(plugin = %name, "{}", err);
                Err(err)
            }
            Err(err) => {
                self.states.insert(name.clone(), PluginState::Discovered);
                self.fail(&name, err.to_string());
                Err(err)
            }
        }
    }

    /// `Loaded -> Initialized`.
    pub fn initialize(&mut self, name: &str) -> Result<(), LifecycleError> {
        self.expect_state(name, PluginState::Loaded, PluginState::Initialized)?;

        let result = match self.handle_mut(name) {
            Some(handle) => {
                let settings = handle.descriptor().settings.clone();
                match handle.entry_mut() {
                    Some(entry) => entry.initialize(&settings),
                    None => Err("entry points already released".to_string()),
                }
            }
            None => return Err(not_loaded(name)),
        };

        match result {
            Ok(()) => {
                self.record(name, PluginState::Initialized, None);
                Ok(())
            }
            Err(message) => {
                self.fail(name, message.clone());
                self.drop_handle(name);
                Err(LifecycleError::InitializationFailure {
                    name: name.to_string(),
                    message,
                })
            }
        }
    }

    /// `Initialized -> Running`.
    pub fn start(&mut self, name: &str) -> Result<(), LifecycleError> {
        self.expect_state(name, PluginState::Initialized, PluginState::Running)?;

        let result = match self.handle_mut(name) {
            Some(handle) => match handle.entry_mut() {
                Some(entry) => entry.start(),
                None => Err("entry points already released".to_string()),
            },
            None => return Err(not_loaded(name)),
        };

        match result {
            Ok(()) => {
                self.record(name, PluginState::Running, None);
                Ok(())
            }
            Err(message) => {
                self.fail(name, message.clone());
                self.drop_handle(name);
                Err(LifecycleError::StartFailure {
                    name: name.to_string(),
                    message,
                })
            }
        }
    }

    /// Load, initialize and start every enabled descriptor in order.
    ///
    /// Under [`StartupPolicy::Fatal`] the first failure drains every plugin
    /// already started and aborts with [`LifecycleError::StartupAborted`].
    pub fn start_all(
        &mut self,
        descriptors: &[PluginDescriptor],
    ) -> Result<StartupReport, HostError> {
        let mut report = StartupReport::default();

        for descriptor in descriptors {
            if !descriptor.enabled {
                tracing::info!(plugin = %descriptor.name, "Plugin disabled; skipping");
                self.states
                    .entry(descriptor.name.clone())
                    .or_insert(PluginState::Discovered);
                report.skipped.push(descriptor.name.clone());
                continue;
            }

            let recorded = self.failures.len();
            match self.bring_up(descriptor) {
                Ok(()) => report.running.push(descriptor.name.clone()),
                Err(message) => {
                    if self.options.policy == StartupPolicy::Fatal {
                        tracing::error!(
                            plugin = %descriptor.name,
                            "Startup policy is fatal; draining {} running plugin(s)",
                            self.running().len()
                        );
                        self.shutdown();
                        return Err(LifecycleError::StartupAborted {
                            name: descriptor.name.clone(),
                            message,
                        }
                        .into());
                    }

                    tracing::warn!(plugin = %descriptor.name, "Skipping failed plugin");
                    if self.failures.len() > recorded {
                        report
                            .failed
                            .extend(self.failures[recorded..].iter().cloned());
                    } else {
                        report.failed.push(PluginFailure {
                            plugin: descriptor.name.clone(),
                            stage: self
                                .state(&descriptor.name)
                                .unwrap_or(PluginState::Discovered),
                            message,
                        });
                    }
                }
            }
        }

        tracing::info!(
            "Startup complete: {} running, {} failed, {} skipped",
            report.running.len(),
            report.failed.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn bring_up(&mut self, descriptor: &PluginDescriptor) -> Result<(), String> {
        self.load(descriptor).map_err(|e| e.to_string())?;
        self.initialize(&descriptor.name).map_err(|e| e.to_string())?;
        self.start(&descriptor.name).map_err(|e| e.to_string())
    }

    /// Unload a plugin, draining it first if it is running.
    ///
    /// Returns `None` when nothing is loaded under `name`.
    pub fn unload(&mut self, name: &str) -> Option<DrainOutcome> {
        let index = self.handles.iter().position(|h| h.name() == name)?;
        let mut handle = self.handles.remove(index);

        let outcome = if handle.state() == PluginState::Running {
            self.record(name, PluginState::Draining, None);
            handle.set_state(PluginState::Draining);

            match handle.take_entry() {
                Some(entry) => drain(name, entry, self.options.drain_timeout),
                None => DrainOutcome::StopFailed("entry points already released".to_string()),
            }
        } else {
            DrainOutcome::Released
        };

        match &outcome {
            DrainOutcome::Released | DrainOutcome::Stopped => {
                self.record(name, PluginState::Unloaded, None);
                handle.set_state(PluginState::Unloaded);
            }
            DrainOutcome::StopFailed(message) => {
                self.fail(name, format!("stop failed: {}", message));
                handle.set_state(PluginState::Failed);
            }
            DrainOutcome::TimedOut => {
                let err = LifecycleError::DrainTimeout {
                    name: name.to_string(),
                    timeout_ms: self.options.drain_timeout.as_millis(),
                };
                self.fail(name, err.to_string());
                handle.set_state(PluginState::Failed);
            }
        }

        handle.release();
        self.load_order.retain(|loaded| loaded != name);
        self.loader.release(name);
        Some(outcome)
    }

    /// Unload every plugin in reverse load order.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        let names: Vec<String> = self
            .handles
            .iter()
            .rev()
            .map(|h| h.name().to_string())
            .collect();

        for name in names {
            if let Some(outcome) = self.unload(&name) {
                report.outcomes.push((name, outcome));
            }
        }

        if !report.timed_out().is_empty() {
            tracing::error!(
                "Drain timed out for: {}",
                report.timed_out().join(", ")
            );
        }
        report
    }

    fn handle_mut(&mut self, name: &str) -> Option<&mut PluginHandle> {
        self.handles.iter_mut().find(|h| h.name() == name)
    }

    fn expect_state(
        &self,
        name: &str,
        required: PluginState,
        next: PluginState,
    ) -> Result<(), LifecycleError> {
        match self.handles.iter().find(|h| h.name() == name) {
            None => Err(not_loaded(name)),
            Some(handle) if handle.state() != required => Err(LifecycleError::InvalidTransition {
                name: name.to_string(),
                from: handle.state().to_string(),
                to: next.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    /// Release a failed plugin's module and forget it in the loader.
    fn drop_handle(&mut self, name: &str) {
        if let Some(index) = self.handles.iter().position(|h| h.name() == name) {
            let mut handle = self.handles.remove(index);
            handle.release();
        }
        self.load_order.retain(|loaded| loaded != name);
        self.loader.release(name);
    }

    fn fail(&mut self, name: &str, message: String) {
        let stage = self.state(name).unwrap_or(PluginState::Discovered);
        self.failures.push(PluginFailure {
            plugin: name.to_string(),
            stage,
            message: message.clone(),
        });
        self.record(name, PluginState::Failed, Some(message));
    }

    fn record(&mut self, name: &str, to: PluginState, detail: Option<String>) {
        let from = self.state(name).unwrap_or(PluginState::Discovered);
        debug_assert!(from.can_transition_to(to), "{} -> {}", from, to);

        if to == PluginState::Failed {
            tracing::error!(
                plugin = %name,
                from = %from,
                "Plugin failed: {}",
                detail.as_deref().unwrap_or("unknown error")
            );
        } else {
            tracing::info!(plugin = %name, from = %from, to = %to, "Plugin state changed");
        }

        self.states.insert(name.to_string(), to);
        if let Some(handle) = self.handle_mut(name) {
            handle.set_state(to);
        }
        self.events.push(LifecycleEvent {
            plugin: name.to_string(),
            from,
            to,
            at: Utc::now(),
            detail,
        });
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            tracing::warn!(
                "Lifecycle manager dropped with {} loaded plugin(s); draining",
                self.handles.len()
            );
            self.shutdown();
        }
    }
}

fn not_loaded(name: &str) -> LifecycleError {
    LifecycleError::NotLoaded {
        name: name.to_string(),
    }
}

/// Call `stop` on its own thread and wait at most `timeout`.
///
/// On timeout the thread keeps the entry points, and with them the module,
/// until `stop` eventually returns.
fn drain(name: &str, mut entry: Box<dyn EntryPoints>, timeout: Duration) -> DrainOutcome {
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name(format!("drain-{}", name))
        .spawn(move || {
            let result = entry.stop();
            let _ = tx.send(result);
        });

    if let Err(e) = spawned {
        return DrainOutcome::StopFailed(format!("failed to spawn drain thread: {}", e));
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(())) => DrainOutcome::Stopped,
        Ok(Err(message)) => DrainOutcome::StopFailed(message),
        Err(RecvTimeoutError::Timeout) => DrainOutcome::TimedOut,
        Err(RecvTimeoutError::Disconnected) => {
            DrainOutcome::StopFailed("stop entry point panicked".to_string())
        }
    }
}
