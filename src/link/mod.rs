// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Platform link adapter.
//!
//! Native loaders disagree on how "keep and export everything" is spelled:
//! ELF and Solaris linkers retain whole archives, Mach-O force-loads every
//! member, and AIX needs a separate pre-link merge into one object. The
//! choice is a [`LinkStrategy`] picked once per target family; the
//! [`PlatformLinkAdapter`] then verifies at startup that the promised
//! symbols really are visible before any plugin is loaded.

mod adapter;
mod prelink;
mod resolver;
mod strategy;

pub use adapter::{resolve_archives, NativeLinkAdapter, PlatformLinkAdapter};
pub use prelink::PrelinkPass;
pub use resolver::{ProcessSymbols, StaticSymbols, SymbolResolver};
pub use strategy::{
    Invocation, LinkStrategy, RetentionFlavor, TargetFamily, PRELINK_OBJECT_NAME,
};
