// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Human-readable rendering of reports.

use console::style;

use crate::lifecycle::{DrainOutcome, ShutdownReport, StartupReport};
use crate::manifest::HostExportManifest;
use crate::registry::PluginRegistry;

pub fn print_manifest(manifest: &HostExportManifest) {
    println!(
        "{} v{} ({} libraries, {} symbols)",
        style("Export manifest").bold(),
        manifest.version(),
        manifest.libraries().len(),
        manifest.symbol_count()
    );

    for library in manifest.libraries() {
        match &library.archive {
            Some(archive) => println!("  {} {}", style(&library.name).cyan(), style(archive).dim()),
            None => println!("  {}", style(&library.name).cyan()),
        }
        for symbol in &library.symbols {
            println!("    {}", symbol);
        }
    }
}

pub fn print_registry(registry: &PluginRegistry) {
    if registry.is_empty() {
        println!("{} No plugins configured", style("ℹ").blue());
        return;
    }

    for descriptor in registry.descriptors() {
        let marker = if descriptor.enabled {
            style("●").green()
        } else {
            style("○").dim()
        };
        println!(
            "  {} {} {}",
            marker,
            style(&descriptor.name).bold(),
            style(descriptor.path.display()).dim()
        );
    }
}

pub fn print_startup(report: &StartupReport) {
    for name in &report.running {
        println!("{} {} running", style("✓").green().bold(), name);
    }
    for name in &report.skipped {
        println!("{} {} disabled", style("-").dim(), name);
    }
    for failure in &report.failed {
        println!(
            "{} {} failed while {}: {}",
            style("✗").red().bold(),
            failure.plugin,
            failure.stage,
            failure.message
        );
    }
}

pub fn print_shutdown(report: &ShutdownReport) {
    for (name, outcome) in &report.outcomes {
        match outcome {
            DrainOutcome::Released => println!("{} {} released", style("✓").green(), name),
            DrainOutcome::Stopped => println!("{} {} stopped", style("✓").green(), name),
            DrainOutcome::StopFailed(message) => println!(
                "{} {} stop failed: {}",
                style("✗").red().bold(),
                name,
                message
            ),
            DrainOutcome::TimedOut => println!(
                "{} {} did not stop in time; force-unloaded",
                style("⚠").yellow().bold(),
                name
            ),
        }
    }
}
