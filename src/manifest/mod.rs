// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Host export manifest.
//!
//! The host statically links every library a plugin may need and promises
//! that their symbols stay resolvable after startup. This module owns the
//! record of that promise: libraries are registered with the
//! [`HostDependencyAggregator`], which is frozen into an immutable
//! [`HostExportManifest`] before the first plugin load.

mod aggregator;
mod entry;

pub use aggregator::HostDependencyAggregator;
pub use entry::{is_valid_symbol, HostExportManifest, LibraryEntry};
