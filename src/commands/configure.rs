// src/commands/configure.rs

//! The `configure` command

use super::load_options;
use crate::cli::ConfigureArgs;
use anyhow::Result;
use extpkg::config::Toolchain;
use extpkg::session::ConfigureSession;
use tracing::{info, warn};

pub fn cmd_configure(args: &ConfigureArgs, dry_run: bool, json: bool) -> Result<()> {
    let options = load_options(args)?;
    let toolchain = Toolchain::detect(&options);
    info!(
        "Configuring external packages for {}/{}",
        options.petsc_dir.display(),
        options.arch
    );

    let mut session = ConfigureSession::new(options, toolchain).dry_run(dry_run);
    let report = match session.run() {
        Ok(report) => report,
        Err(e) => {
            // keep whatever was logged before the failure
            if !dry_run {
                keep_partial_outputs(&session);
            }
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("External packages ({}):", report.packages.len());
    for package in &report.packages {
        let location = package
            .directory
            .as_deref()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        let version = package
            .version
            .as_deref()
            .map(|v| format!(" [{}]", v))
            .unwrap_or_default();
        println!(
            "  {:<12} {:<10} {}{}",
            package.name,
            serde_json::to_value(package.outcome)?
                .as_str()
                .unwrap_or_default(),
            location,
            version
        );
    }
    for path in &report.generated {
        println!("Wrote {}", path.display());
    }
    if dry_run {
        println!("\n[DRY RUN] Nothing was downloaded, built or written.");
        for line in session.log().as_str().lines() {
            println!("  {}", line);
        }
    }
    Ok(())
}

/// Write what was logged before a failed run; a write failure only warns
fn keep_partial_outputs(session: &ConfigureSession) -> bool {
    match session.write_outputs() {
        Ok(_) => true,
        Err(e) => {
            warn!("Failed to write configure outputs: {}", e);
            false
        }
    }
}
