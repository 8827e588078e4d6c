// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::lifecycle::StartupPolicy;

/// hostlink - plugin host with an explicit export surface
///
/// Loads native plugin modules at startup and resolves them against the
/// libraries the host links statically and exports.
#[derive(Parser, Debug)]
#[command(name = "hostlink")]
#[command(author = "Eshan Roy")]
#[command(version)]
#[command(about = "Plugin host with an explicit export surface", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to run (defaults to run if not specified)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format for machine-readable output
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "HOSTLINK_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Output format for scripting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text output (default)
    Text,
    /// JSON output for machine parsing
    Json,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start plugins and serve until interrupted (default command)
    Run(RunArgs),

    /// Verify the export surface and plugin registry without loading plugins
    Check,

    /// Print the host export manifest
    Manifest,

    /// Print the linker arguments that export the manifest's archives
    LinkArgs(LinkArgsArgs),

    /// Run the pre-link pass for two-phase platforms
    Prelink(PrelinkArgs),

    /// Write an example configuration
    Init(InitArgs),

    /// Print version information
    Version,
}

/// Arguments for the run command.
#[derive(Parser, Debug, Default, Clone)]
pub struct RunArgs {
    /// Override the startup policy
    #[arg(long, value_enum)]
    pub policy: Option<StartupPolicy>,

    /// Override the drain bound in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub drain_timeout_ms: Option<u64>,

    /// Shut down as soon as startup completes
    #[arg(long)]
    pub once: bool,
}

/// Arguments for the link-args command.
#[derive(Parser, Debug, Default, Clone)]
pub struct LinkArgsArgs {
    /// Target OS to compute arguments for (defaults to this platform)
    #[arg(long)]
    pub target_os: Option<String>,
}

/// Arguments for the prelink command.
#[derive(Parser, Debug, Default, Clone)]
pub struct PrelinkArgs {
    /// Only create the placeholder object
    #[arg(long)]
    pub placeholder_only: bool,

    /// Target OS (defaults to this platform)
    #[arg(long)]
    pub target_os: Option<String>,
}

/// Arguments for the init command.
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Overwrite an existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Where to write the configuration
    #[arg(long, default_value = "hostlink.toml")]
    pub path: PathBuf,
}

impl Cli {
    /// Whether output should be JSON.
    pub fn is_json(&self) -> bool {
        self.format == Some(OutputFormat::Json)
    }

    /// Get the effective command, defaulting to Run if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Run(RunArgs::default()))
    }
}
