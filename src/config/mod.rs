// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Configuration module for hostlink.
//!
//! This module handles locating, parsing, and validating the host
//! configuration: export manifest, link settings, and plugin declarations.

pub mod default;
mod loader;
mod schema;

pub use default::default_config;
pub use loader::{find_config_file, find_config_file_from, load_config, parse_config};
pub use schema::*;
