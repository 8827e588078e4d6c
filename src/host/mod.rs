// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Host startup orchestration and exit codes.

mod bootstrap;
mod exit;

pub use bootstrap::{
    build_manifest, current_strategy, native_adapter, plugin_entries, prelink_object, Host,
    Preflight,
};
pub use exit::ExitStatus;
