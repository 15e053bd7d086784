// src/commands/package.rs

//! Per-package inspection: formed arguments and install plans

use super::load_options;
use crate::cli::ConfigureArgs;
use anyhow::Result;
use extpkg::config::Toolchain;
use extpkg::session::ConfigureSession;

fn prepared(package: &str, args: &ConfigureArgs) -> Result<(ConfigureSession, extpkg::package::PackageId)> {
    let options = load_options(args)?;
    let toolchain = Toolchain::detect(&options);
    let mut session = ConfigureSession::new(options, toolchain).dry_run(true);
    let id = session.prepare(package)?;
    Ok((session, id))
}

/// Print one formed argument per line
pub fn cmd_args(package: &str, args: &ConfigureArgs) -> Result<()> {
    let (session, id) = prepared(package, args)?;
    let formed = session.form_arguments(id)?;
    if formed.is_empty() {
        let name = session.registry().get(id)?.name().to_string();
        println!("{} takes no build-tool arguments", name);
    }
    for arg in formed.render() {
        println!("{}", arg);
    }
    Ok(())
}

/// Print the generated files, steps and make rules of a package
pub fn cmd_plan(package: &str, args: &ConfigureArgs) -> Result<()> {
    let (session, id) = prepared(package, args)?;
    let plan = session.install_plan(id)?;
    let name = session.registry().get(id)?.name().to_string();

    println!("Install plan for {}:", name);
    for file in &plan.files {
        println!("\nGenerated {}:", file.path.display());
        for line in file.contents.lines() {
            println!("  {}", line);
        }
    }
    if let Some(record) = &plan.record {
        println!("\nRecorded as {}", record.record.display());
    }
    if !plan.steps.is_empty() {
        println!("\nSteps:");
    }
    for step in &plan.steps {
        println!(
            "  [{}] {:?}, {}s: {}",
            step.label,
            step.policy,
            step.chain.timeout_duration().as_secs(),
            step.chain.render()
        );
    }
    if !plan.fragment.is_empty() {
        println!("\nMake rules:");
        print!("{}", plan.fragment.render_makefile());
    }
    for notice in &plan.notices {
        println!("\n{}", extpkg::buildlog::boxed(notice, '='));
    }
    Ok(())
}
