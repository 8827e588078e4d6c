// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! hostlink - plugin host with an explicit export surface.

use clap::Parser;
use hostlink::cli::{run, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Set up logging
    setup_logging(cli.debug);

    match run(cli) {
        Ok(status) => std::process::exit(status.code()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_status().code());
        }
    }
}

/// Set up logging/tracing.
///
/// Logs go to stderr so JSON output on stdout stays parseable.
fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::try_new("hostlink=debug,warn").unwrap_or_else(|_| EnvFilter::new("warn"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if debug {
        tracing::debug!("Debug logging enabled");
    }
}
