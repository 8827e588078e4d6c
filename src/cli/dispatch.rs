// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Command dispatch and execution.

use console::style;
use serde_json::json;

use crate::config::HostConfig;
use crate::error::{ConfigError, HostError, LinkError, Result, ResultExt};
use crate::host::{
    build_manifest, native_adapter, plugin_entries, prelink_object, ExitStatus, Host, Preflight,
};
use crate::link::{resolve_archives, LinkStrategy, PlatformLinkAdapter, PrelinkPass, TargetFamily};
use crate::loader::NativeBackend;
use crate::registry::RuntimeLayout;

use super::args::{Cli, Commands, InitArgs, LinkArgsArgs, PrelinkArgs, RunArgs};
use super::output;

/// Run the CLI with the given arguments.
pub fn run(cli: Cli) -> Result<ExitStatus> {
    match cli.effective_command() {
        Commands::Run(args) => run_host(&cli, load(&cli)?, args),
        Commands::Check => run_check(&cli, &load(&cli)?),
        Commands::Manifest => run_manifest(&cli, &load(&cli)?),
        Commands::LinkArgs(args) => run_link_args(&cli, &load(&cli)?, args),
        Commands::Prelink(args) => run_prelink(&cli, &load(&cli)?, args),
        Commands::Init(args) => run_init(args),
        Commands::Version => run_version(),
    }
}

fn load(cli: &Cli) -> Result<HostConfig> {
    match &cli.config {
        Some(path) => HostConfig::load_from(path),
        None => HostConfig::load(),
    }
}

fn emit_json(value: &impl serde::Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("json output")?;
    println!("{}", text);
    Ok(())
}

/// Run the run command.
fn run_host(cli: &Cli, mut config: HostConfig, args: RunArgs) -> Result<ExitStatus> {
    tracing::debug!("Running host with args: {:?}", args);

    if let Some(policy) = args.policy {
        config.host.startup_policy = policy;
    }
    if let Some(ms) = args.drain_timeout_ms {
        config.host.drain_timeout_ms = ms;
    }

    let layout = RuntimeLayout::from_config(&config);
    let adapter = native_adapter(&config)?;
    let host = Host::bootstrap(&config, &layout, &adapter, Box::new(NativeBackend::new()))?;

    if cli.is_json() {
        println!(
            "{}",
            serde_json::to_string(host.startup_report()).context("json output")?
        );
    } else {
        output::print_startup(host.startup_report());
    }

    if !args.once {
        if !cli.is_json() {
            println!(
                "{} Serving {} plugin(s); press Ctrl+C to stop",
                style("ℹ").blue(),
                host.startup_report().running.len()
            );
        }
        super::signal::wait_for_shutdown()?;
    }

    let report = host.shutdown();
    if cli.is_json() {
        println!("{}", serde_json::to_string(&report).context("json output")?);
    } else {
        output::print_shutdown(&report);
    }

    Ok(ExitStatus::from_shutdown(&report))
}

/// Run the check command.
fn run_check(cli: &Cli, config: &HostConfig) -> Result<ExitStatus> {
    let layout = RuntimeLayout::from_config(config);
    let adapter = native_adapter(config)?;
    let preflight = Preflight::run(config, &layout, &adapter)?;

    if cli.is_json() {
        emit_json(&json!({
            "strategy": adapter.strategy().name(),
            "manifest_version": preflight.manifest.version(),
            "symbols": preflight.manifest.symbol_count(),
            "plugins": preflight.registry.descriptors(),
        }))?;
    } else {
        println!(
            "{} Export surface verified ({}, {} symbols)",
            style("✓").green().bold(),
            adapter.strategy(),
            preflight.manifest.symbol_count()
        );
        println!(
            "{} {} plugin(s) registered, {} enabled",
            style("✓").green().bold(),
            preflight.registry.len(),
            preflight.registry.enabled().count()
        );
        output::print_registry(&preflight.registry);
    }

    Ok(ExitStatus::Success)
}

/// Run the manifest command.
fn run_manifest(cli: &Cli, config: &HostConfig) -> Result<ExitStatus> {
    let manifest = build_manifest(config, &plugin_entries(config))?;

    if cli.is_json() {
        emit_json(&*manifest)?;
    } else {
        output::print_manifest(&manifest);
    }

    Ok(ExitStatus::Success)
}

fn target_family(target_os: Option<&str>) -> Result<TargetFamily> {
    let os = target_os.unwrap_or(std::env::consts::OS);
    TargetFamily::from_target_os(os).ok_or_else(|| {
        HostError::Link(LinkError::UnsupportedPlatform {
            target: os.to_string(),
        })
    })
}

/// Run the link-args command.
fn run_link_args(cli: &Cli, config: &HostConfig, args: LinkArgsArgs) -> Result<ExitStatus> {
    let family = target_family(args.target_os.as_deref())?;
    let strategy = LinkStrategy::for_family(family, &prelink_object(config));
    let manifest = build_manifest(config, &plugin_entries(config))?;
    let archives = resolve_archives(&manifest, &config.base_dir())?;

    let link_args = strategy.host_link_args(&archives);
    let prelink = strategy.prelink_invocation(&archives);

    if cli.is_json() {
        emit_json(&json!({
            "strategy": strategy.name(),
            "two_phase": strategy.is_two_phase(),
            "args": link_args,
            "prelink": prelink.map(|inv| {
                let mut argv = vec![inv.program];
                argv.extend(inv.args);
                argv
            }),
        }))?;
    } else {
        if let Some(inv) = prelink {
            println!("# pre-link: {} {}", inv.program, inv.args.join(" "));
        }
        for arg in link_args {
            println!("{}", arg);
        }
    }

    Ok(ExitStatus::Success)
}

/// Run the prelink command.
fn run_prelink(cli: &Cli, config: &HostConfig, args: PrelinkArgs) -> Result<ExitStatus> {
    let family = target_family(args.target_os.as_deref())?;
    let strategy = LinkStrategy::for_family(family, &prelink_object(config));

    let archives = if args.placeholder_only {
        Vec::new()
    } else {
        let manifest = build_manifest(config, &plugin_entries(config))?;
        resolve_archives(&manifest, &config.base_dir())?
    };

    let Some(pass) = PrelinkPass::new(&strategy, archives) else {
        if !cli.is_json() {
            println!(
                "{} {} is single-phase; nothing to pre-link",
                style("ℹ").blue(),
                strategy
            );
        }
        return Ok(ExitStatus::Success);
    };

    if args.placeholder_only {
        let created = pass.ensure_placeholder()?;
        if !cli.is_json() {
            let verb = if created { "Created" } else { "Kept existing" };
            println!(
                "{} {} placeholder {}",
                style("✓").green().bold(),
                verb,
                pass.object().display()
            );
        }
    } else {
        pass.run()?;
        if !cli.is_json() {
            println!(
                "{} Merged object written to {}",
                style("✓").green().bold(),
                pass.object().display()
            );
        }
    }

    if cli.is_json() {
        emit_json(&json!({ "object": pass.object() }))?;
    }

    Ok(ExitStatus::Success)
}

/// Run the version command.
fn run_version() -> Result<ExitStatus> {
    println!("hostlink {}", crate::version::version_string());

    if let Some(sha) = crate::version::GIT_SHA {
        println!("git commit: {}", sha);
    }
    if let Some(date) = crate::version::GIT_COMMIT_DATE {
        println!("commit date: {}", date);
    }
    println!("plugin ABI: {}", crate::loader::abi::ABI_VERSION);

    Ok(ExitStatus::Success)
}

/// Run the init command.
fn run_init(args: InitArgs) -> Result<ExitStatus> {
    use crate::config::default::example_config;

    tracing::debug!("Running init command with args: {:?}", args);

    if args.path.exists() && !args.force {
        return Err(HostError::Config(ConfigError::AlreadyExists { path: args.path }));
    }

    std::fs::write(&args.path, example_config()).map_err(|e| HostError::WithContext {
        context: "init".to_string(),
        message: format!("Failed to write configuration: {}", e),
    })?;

    println!(
        "{} Created {}",
        style("✓").green().bold(),
        args.path.display()
    );

    Ok(ExitStatus::Success)
}
