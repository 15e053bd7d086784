// src/commands/mod.rs
//! Command handlers for the extpkg CLI

mod configure;
mod docs;
mod package;
mod target;

pub use configure::cmd_configure;
pub use docs::{cmd_docs_hook, cmd_docs_version};
pub use package::{cmd_args, cmd_plan};
pub use target::cmd_target;

use crate::cli::ConfigureArgs;
use anyhow::{Context, Result};
use extpkg::config::ConfigureOptions;

/// Options from the preset (if any) with command line options on top
pub(crate) fn load_options(args: &ConfigureArgs) -> Result<ConfigureOptions> {
    let mut options = match &args.preset {
        Some(path) => ConfigureOptions::from_preset(path)
            .with_context(|| format!("Failed to load preset {}", path.display()))?,
        None => ConfigureOptions::default(),
    };
    options.apply_args(&args.options)?;
    Ok(options)
}
