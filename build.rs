// Author: Eshan Roy
// SPDX-License-Identifier: MIT

use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use vergen::EmitBuilder;

#[path = "src/link/strategy.rs"]
#[allow(dead_code)]
mod strategy;

use strategy::{LinkStrategy, TargetFamily, PRELINK_OBJECT_NAME};

fn main() -> Result<(), Box<dyn Error>> {
    EmitBuilder::builder()
        .git_sha(true)
        .git_commit_date()
        .emit()?;

    emit_export_surface()?;
    Ok(())
}

/// Link the archives listed in `HOSTLINK_EXPORT_ARCHIVES` into the host
/// binary with every symbol kept and exported.
fn emit_export_surface() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-env-changed=HOSTLINK_EXPORT_ARCHIVES");
    println!("cargo:rerun-if-env-changed=HOSTLINK_PRELINK_OBJECT");

    let Some(list) = env::var_os("HOSTLINK_EXPORT_ARCHIVES") else {
        return Ok(());
    };

    let archives: Vec<PathBuf> = env::split_paths(&list)
        .filter(|p| !p.as_os_str().is_empty())
        .collect();
    if archives.is_empty() {
        return Ok(());
    }
    for archive in &archives {
        println!("cargo:rerun-if-changed={}", archive.display());
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS")?;
    let Some(family) = TargetFamily::from_target_os(&target_os) else {
        println!(
            "cargo:warning=hostlink: no export strategy for target_os '{}'; archives not exported",
            target_os
        );
        return Ok(());
    };

    let object = match env::var_os("HOSTLINK_PRELINK_OBJECT") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(env::var("OUT_DIR")?).join(PRELINK_OBJECT_NAME),
    };
    let strategy = LinkStrategy::for_family(family, &object);

    if let Some(invocation) = strategy.prelink_invocation(&archives) {
        // The host link step must never see a missing input.
        if !object.exists() {
            if let Some(parent) = object.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&object, b"")?;
        }

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .status()?;
        if !status.success() {
            return Err(format!(
                "pre-link pass failed ({}): {} {}",
                status,
                invocation.program,
                invocation.args.join(" ")
            )
            .into());
        }
    }

    for arg in strategy.host_link_args(&archives) {
        println!("cargo:rustc-link-arg-bins={}", arg);
    }

    Ok(())
}
