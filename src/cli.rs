// src/cli.rs
//! CLI definitions for extpkg
//!
//! Command implementations live in the `commands` module.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "extpkg")]
#[command(version)]
#[command(about = "Configure, build and install the external packages of a PETSc build", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Configure options shared by the package commands
#[derive(Args, Debug, Clone)]
pub struct ConfigureArgs {
    /// TOML preset holding a `configure_options` list, applied first
    #[arg(long)]
    pub preset: Option<PathBuf>,

    /// Configure options (`--download-mmg`, `--with-mpi-dir=...`, `CC=mpicc`)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub options: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve, download, build and install the requested packages
    Configure {
        #[command(flatten)]
        args: ConfigureArgs,

        /// Show what would run without downloading or building
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the build-tool arguments formed for a package
    Args {
        /// Package key (e.g. moab, mmg)
        package: String,

        #[command(flatten)]
        args: ConfigureArgs,
    },

    /// Print the install plan for a package without running it
    Plan {
        /// Package key (e.g. scalapack, slepc)
        package: String,

        #[command(flatten)]
        args: ConfigureArgs,
    },

    /// Map a source file through a SYCL toolchain stage
    Target {
        /// Source file
        source: String,

        /// Toolchain stage
        #[arg(long, value_enum, default_value = "compiler")]
        stage: Stage,

        /// Output file; without one the command is a no-op
        #[arg(short, long)]
        output: Option<String>,

        /// Tool settings (`SYCLCXX=icpx`, `SYCLCXXFLAGS=-fsycl`)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        settings: Vec<String>,
    },

    /// Print the documentation version strings of a source tree
    DocsVersion {
        /// Root of the source tree (holds include/petscversion.h)
        #[arg(default_value = ".")]
        root: PathBuf,
    },

    /// Run the documentation builder-inited hook
    DocsHook {
        /// Documentation directory
        #[arg(default_value = "doc")]
        docs_dir: PathBuf,

        /// Builder name passed to the team table generator
        #[arg(short, long, default_value = "html")]
        builder: String,

        /// Generator script (default: <docs dir>/ext/genteamtable.py)
        #[arg(long)]
        script: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    Preprocessor,
    Compiler,
    Linker,
    StaticLinker,
    SharedLinker,
    DynamicLinker,
}
