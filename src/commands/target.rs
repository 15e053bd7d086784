// src/commands/target.rs

//! The `target` command

use crate::cli::Stage;
use anyhow::Result;
use extpkg::config::{ConfigureOptions, Toolchain};
use extpkg::toolchain::{Processor, sycl};

fn processor(stage: Stage, toolchain: &Toolchain) -> Processor {
    match stage {
        Stage::Preprocessor => sycl::preprocessor(),
        Stage::Compiler => sycl::compiler(false),
        Stage::Linker => sycl::linker(&[]),
        Stage::StaticLinker => sycl::static_linker(&toolchain.ar_lib_suffix),
        Stage::SharedLinker => sycl::shared_linker(),
        Stage::DynamicLinker => sycl::dynamic_linker(),
    }
}

pub fn cmd_target(
    source: &str,
    stage: Stage,
    output: Option<&str>,
    settings: &[String],
) -> Result<()> {
    let options = ConfigureOptions::from_args(settings)?;
    let toolchain = Toolchain::from_options(&options);
    let processor = processor(stage, &toolchain);

    match processor.get_target(source) {
        Some(target) => println!("target:  {}", target),
        None => println!("target:  (none, {} is a header)", source),
    }
    println!(
        "command: {}",
        processor.get_command(&toolchain, &[source], output)?
    );
    Ok(())
}
