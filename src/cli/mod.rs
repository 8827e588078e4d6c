// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! CLI module for hostlink.
//!
//! This module handles command-line argument parsing and command dispatch.

pub mod args;
mod dispatch;
mod output;
mod signal;

pub use args::{Cli, Commands};
pub use dispatch::run;
