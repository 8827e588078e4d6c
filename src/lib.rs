// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! hostlink - plugin host with an explicit export surface.
//!
//! The host links the libraries its plugins depend on statically and keeps
//! every one of their symbols exported, then loads plugin modules at
//! startup and binds them eagerly against that surface.
//!
//! # Startup
//!
//! - **Export manifest**: the libraries and symbols the host promises to
//!   plugins, frozen before the first load
//! - **Link adapter**: the per-platform way of exporting them (archive
//!   retention, forced load or a pre-link pass) and a check that it worked
//! - **Registry**: the configured plugins, in declaration order
//! - **Loader**: opens modules, rejects unresolved symbols and ABI mismatches
//! - **Lifecycle**: initialize, start, and drain in reverse load order
//!
//! # Example
//!
//! ```no_run
//! use hostlink::config::HostConfig;
//! use hostlink::host::{native_adapter, Host};
//! use hostlink::loader::NativeBackend;
//! use hostlink::registry::RuntimeLayout;
//!
//! let config = HostConfig::load().unwrap();
//! let layout = RuntimeLayout::from_config(&config);
//! let adapter = native_adapter(&config).unwrap();
//!
//! let host = Host::bootstrap(&config, &layout, &adapter, Box::new(NativeBackend::new())).unwrap();
//! println!("running: {:?}", host.startup_report().running);
//!
//! let report = host.shutdown();
//! assert!(report.timed_out().is_empty());
//! ```

// Module declarations
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod link;
pub mod loader;
pub mod manifest;
pub mod registry;

// Re-exports for convenience
pub use config::HostConfig;
pub use error::{HostError, Result};

/// Version information embedded at compile time.
pub mod version {
    /// The current version of hostlink.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// The git SHA at compile time (if available).
    pub const GIT_SHA: Option<&str> = option_env!("VERGEN_GIT_SHA");

    /// The git commit date at compile time (if available).
    pub const GIT_COMMIT_DATE: Option<&str> = option_env!("VERGEN_GIT_COMMIT_DATE");

    /// Get a formatted version string.
    pub fn version_string() -> String {
        match (GIT_SHA, GIT_COMMIT_DATE) {
            (Some(sha), Some(date)) => {
                format!("{} ({} {})", VERSION, &sha[..7.min(sha.len())], date)
            }
            (Some(sha), None) => {
                format!("{} ({})", VERSION, &sha[..7.min(sha.len())])
            }
            _ => VERSION.to_string(),
        }
    }
}
