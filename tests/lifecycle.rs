// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Load and lifecycle behaviour, driven through fake module backends.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hostlink::config::parse_config;
use hostlink::error::{HostError, LifecycleError, LoadError};
use hostlink::host::{ExitStatus, Host};
use hostlink::lifecycle::{
    DrainOutcome, LifecycleManager, LifecycleOptions, PluginState, StartupPolicy,
};
use hostlink::link::{LinkStrategy, NativeLinkAdapter, StaticSymbols};
use hostlink::loader::abi::ABI_VERSION;
use hostlink::loader::{
    BoundEntryPoints, DynamicLoader, EntryPoints, ModuleBackend, PluginModule,
};
use hostlink::manifest::{HostDependencyAggregator, HostExportManifest, LibraryEntry};
use hostlink::registry::{PluginDescriptor, RuntimeLayout};
use tempfile::TempDir;

type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Default)]
struct FakePlugin {
    imports: Vec<String>,
    fail_init: bool,
    stop_delay: Option<Duration>,
}

impl FakePlugin {
    fn requiring(symbols: &[&str]) -> Self {
        Self {
            imports: symbols.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

struct FakeCalls {
    name: String,
    plugin: FakePlugin,
    log: CallLog,
}

impl FakeCalls {
    fn note(&self, call: &str) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", call, self.name));
    }
}

impl EntryPoints for FakeCalls {
    fn initialize(&mut self, _settings: &Value) -> Result<(), String> {
        self.note("init");
        if self.plugin.fail_init {
            Err("initialize returned status 7".to_string())
        } else {
            Ok(())
        }
    }

    fn start(&mut self) -> Result<(), String> {
        self.note("start");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), String> {
        self.note("stop");
        if let Some(delay) = self.plugin.stop_delay {
            std::thread::sleep(delay);
        }
        Ok(())
    }
}

struct FakeModule {
    name: String,
    plugin: FakePlugin,
    log: CallLog,
}

impl PluginModule for FakeModule {
    fn imports(&self) -> Vec<String> {
        self.plugin.imports.clone()
    }

    fn bind(&self) -> Result<BoundEntryPoints, LoadError> {
        Ok(BoundEntryPoints {
            abi_version: ABI_VERSION,
            manifest_version: 1,
            calls: Box::new(FakeCalls {
                name: self.name.clone(),
                plugin: self.plugin.clone(),
                log: Arc::clone(&self.log),
            }),
        })
    }
}

#[derive(Clone, Default)]
struct FakeBackend {
    plugins: HashMap<String, FakePlugin>,
    log: CallLog,
    opened: Arc<Mutex<usize>>,
}

impl FakeBackend {
    fn with(mut self, name: &str, plugin: FakePlugin) -> Self {
        self.plugins.insert(name.to_string(), plugin);
        self
    }

    fn calls(&self, prefix: &str) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| c.strip_prefix(prefix).map(str::to_string))
            .collect()
    }
}

impl ModuleBackend for FakeBackend {
    fn open(&self, descriptor: &PluginDescriptor) -> Result<Box<dyn PluginModule>, LoadError> {
        *self.opened.lock().unwrap() += 1;
        let plugin = self.plugins.get(&descriptor.name).cloned().ok_or_else(|| {
            LoadError::OpenFailed {
                plugin: descriptor.name.clone(),
                message: "no such module".to_string(),
            }
        })?;

        Ok(Box::new(FakeModule {
            name: descriptor.name.clone(),
            plugin,
            log: Arc::clone(&self.log),
        }))
    }
}

fn lib_x() -> Arc<HostExportManifest> {
    let mut aggregator = HostDependencyAggregator::new(1);
    aggregator
        .register_library(LibraryEntry::new("libX", ["libX::fn1", "libX::fn2"]))
        .unwrap();
    aggregator.finalize().unwrap()
}

fn manager(backend: &FakeBackend, policy: StartupPolicy, drain_ms: u64) -> LifecycleManager {
    LifecycleManager::new(
        DynamicLoader::new(lib_x(), Box::new(backend.clone())),
        LifecycleOptions {
            policy,
            drain_timeout: Duration::from_millis(drain_ms),
        },
    )
}

fn descriptors(names: &[&str]) -> Vec<PluginDescriptor> {
    names
        .iter()
        .map(|n| PluginDescriptor::new(*n, format!("/plugins/{}.so", n)))
        .collect()
}

#[test]
fn test_plugin_within_manifest_reaches_running() {
    let backend = FakeBackend::default().with("p1", FakePlugin::requiring(&["libX::fn1"]));
    let mut m = manager(&backend, StartupPolicy::Fatal, 500);

    let report = m.start_all(&descriptors(&["p1"])).unwrap();
    assert_eq!(report.running, vec!["p1"]);
    assert_eq!(m.state("p1"), Some(PluginState::Running));
}

#[test]
fn test_unresolved_symbol_is_atomic() {
    let backend = FakeBackend::default()
        .with("p1", FakePlugin::requiring(&["libX::fn1"]))
        .with("p2", FakePlugin::requiring(&["libX::fn3"]));
    let mut m = manager(&backend, StartupPolicy::BestEffort, 500);
    let ds = descriptors(&["p1", "p2"]);

    m.load(&ds[0]).unwrap();
    let err = m.load(&ds[1]).unwrap_err();

    assert_eq!(
        err,
        LoadError::SymbolUnresolved {
            plugin: "p2".to_string(),
            symbol: "libX::fn3".to_string()
        }
    );
    assert_eq!(m.load_order(), ["p1"]);
    assert!(!m.loader().is_loaded("p2"));
    assert_eq!(m.state("p1"), Some(PluginState::Loaded));
    assert_eq!(m.state("p2"), Some(PluginState::Failed));

    m.initialize("p1").unwrap();
    m.start("p1").unwrap();
    assert_eq!(m.running(), vec!["p1"]);
}

#[test]
fn test_already_loaded_and_idempotent_unload() {
    let backend = FakeBackend::default().with("a", FakePlugin::default());
    let mut m = manager(&backend, StartupPolicy::Fatal, 500);
    let d = &descriptors(&["a"])[0];

    m.load(d).unwrap();
    assert!(matches!(m.load(d), Err(LoadError::AlreadyLoaded { .. })));
    assert_eq!(m.state("a"), Some(PluginState::Loaded));

    assert_eq!(m.unload("a"), Some(DrainOutcome::Released));
    assert_eq!(m.unload("a"), None);
    assert_eq!(m.unload("never-loaded"), None);
}

#[test]
fn test_reload_after_unload_lists_plugin_once() {
    let backend = FakeBackend::default()
        .with("a", FakePlugin::default())
        .with("b", FakePlugin::default());
    let mut m = manager(&backend, StartupPolicy::Fatal, 500);
    let ds = descriptors(&["a", "b"]);

    m.load(&ds[0]).unwrap();
    m.load(&ds[1]).unwrap();
    assert_eq!(m.unload("a"), Some(DrainOutcome::Released));
    assert_eq!(m.load_order(), ["b"]);

    m.load(&ds[0]).unwrap();
    assert_eq!(m.load_order(), ["b", "a"]);
    assert_eq!(m.state("a"), Some(PluginState::Loaded));
}

#[test]
fn test_shutdown_reverses_load_order() {
    let backend = FakeBackend::default()
        .with("a", FakePlugin::default())
        .with("b", FakePlugin::default())
        .with("c", FakePlugin::default());
    let mut m = manager(&backend, StartupPolicy::Fatal, 500);

    m.start_all(&descriptors(&["a", "b", "c"])).unwrap();
    let report = m.shutdown();

    assert_eq!(report.unload_order(), vec!["c", "b", "a"]);
    assert_eq!(backend.calls("stop:"), vec!["c", "b", "a"]);
    assert!(report.is_clean());
    for name in ["a", "b", "c"] {
        assert_eq!(m.state(name), Some(PluginState::Unloaded));
    }
}

#[test]
fn test_fatal_policy_drains_running_plugins() {
    let backend = FakeBackend::default()
        .with("p1", FakePlugin::default())
        .with(
            "p2",
            FakePlugin {
                fail_init: true,
                ..FakePlugin::default()
            },
        )
        .with("p3", FakePlugin::default());
    let mut m = manager(&backend, StartupPolicy::Fatal, 500);

    let err = m.start_all(&descriptors(&["p1", "p2", "p3"])).unwrap_err();

    assert!(matches!(
        err,
        HostError::Lifecycle(LifecycleError::StartupAborted { ref name, .. }) if name == "p2"
    ));
    assert_eq!(err.exit_status(), ExitStatus::PluginStartup);
    assert_eq!(backend.calls("stop:"), vec!["p1"]);
    assert_eq!(m.state("p1"), Some(PluginState::Unloaded));
    assert_eq!(m.state("p2"), Some(PluginState::Failed));
    assert_eq!(m.state("p3"), None);
}

#[test]
fn test_drain_timeout_reported_and_others_drain() {
    let backend = FakeBackend::default()
        .with("a", FakePlugin::default())
        .with(
            "b",
            FakePlugin {
                stop_delay: Some(Duration::from_secs(2)),
                ..FakePlugin::default()
            },
        )
        .with("c", FakePlugin::default());
    let mut m = manager(&backend, StartupPolicy::Fatal, 100);

    m.start_all(&descriptors(&["a", "b", "c"])).unwrap();
    let report = m.shutdown();

    assert_eq!(
        report.outcomes,
        vec![
            ("c".to_string(), DrainOutcome::Stopped),
            ("b".to_string(), DrainOutcome::TimedOut),
            ("a".to_string(), DrainOutcome::Stopped),
        ]
    );
    assert_eq!(ExitStatus::from_shutdown(&report), ExitStatus::DrainTimeout);
    assert_eq!(m.state("b"), Some(PluginState::Failed));
    assert!(!m.loader().is_loaded("b"));

    let failure = m.failures().iter().find(|f| f.plugin == "b").unwrap();
    assert_eq!(failure.stage, PluginState::Draining);
    assert!(failure.message.contains("did not stop within 100 ms"));
}

#[test]
fn test_manifest_unchanged_by_loads() {
    let backend = FakeBackend::default()
        .with("p1", FakePlugin::requiring(&["libX::fn1"]))
        .with("p2", FakePlugin::requiring(&["libX::fn3"]));
    let mut m = manager(&backend, StartupPolicy::BestEffort, 500);
    let before: Vec<String> = m.loader().manifest().symbols().map(str::to_string).collect();

    let report = m.start_all(&descriptors(&["p1", "p2"])).unwrap();
    assert_eq!(report.failed.len(), 1);

    let after: Vec<String> = m.loader().manifest().symbols().map(str::to_string).collect();
    assert_eq!(before, after);
}

fn host_fixture(dir: &TempDir, policy: &str) -> hostlink::config::HostConfig {
    for name in ["liba.so", "libb.so"] {
        std::fs::write(dir.path().join(name), b"").unwrap();
    }

    let toml = format!(
        r#"
[host]
startup_policy = "{policy}"
drain_timeout_ms = 500

[[exports.libraries]]
name = "libX"
symbols = ["libX::fn1", "libX::fn2"]

[[plugins.entries]]
name = "a"
path = "{a}"

[[plugins.entries]]
name = "b"
path = "{b}"
"#,
        policy = policy,
        a = dir.path().join("liba.so").display(),
        b = dir.path().join("libb.so").display(),
    );
    parse_config(&toml).unwrap()
}

#[test]
fn test_host_bootstrap_and_shutdown() {
    let dir = TempDir::new().unwrap();
    let config = host_fixture(&dir, "fatal");
    let layout = RuntimeLayout::from_config(&config);
    let adapter = NativeLinkAdapter::new(
        LinkStrategy::ForcedLoad,
        Box::new(StaticSymbols::new(["libX::fn1", "libX::fn2"])),
    );
    let backend = FakeBackend::default()
        .with("a", FakePlugin::requiring(&["libX::fn2"]))
        .with("b", FakePlugin::default());

    let host = Host::bootstrap(&config, &layout, &adapter, Box::new(backend.clone())).unwrap();
    assert_eq!(host.startup_report().running, vec!["a", "b"]);
    assert_eq!(host.state("a"), Some(PluginState::Running));

    let report = host.shutdown();
    assert_eq!(report.unload_order(), vec!["b", "a"]);
    assert_eq!(ExitStatus::from_shutdown(&report), ExitStatus::Success);
}

#[test]
fn test_export_surface_failure_touches_no_plugin() {
    let dir = TempDir::new().unwrap();
    let config = host_fixture(&dir, "best_effort");
    let layout = RuntimeLayout::from_config(&config);
    let adapter = NativeLinkAdapter::new(
        LinkStrategy::ArchiveRetention {
            flavor: hostlink::link::RetentionFlavor::Gnu,
        },
        Box::new(StaticSymbols::new(["libX::fn1"])),
    );
    let backend = FakeBackend::default()
        .with("a", FakePlugin::default())
        .with("b", FakePlugin::default());

    let err = Host::bootstrap(&config, &layout, &adapter, Box::new(backend.clone()))
        .err()
        .unwrap();

    assert_eq!(err.exit_status(), ExitStatus::ExportSurface);
    assert_eq!(*backend.opened.lock().unwrap(), 0);
}
