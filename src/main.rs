// src/main.rs

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Configure {
            args,
            dry_run,
            json,
        } => commands::cmd_configure(&args, dry_run, json),
        Commands::Args { package, args } => commands::cmd_args(&package, &args),
        Commands::Plan { package, args } => commands::cmd_plan(&package, &args),
        Commands::Target {
            source,
            stage,
            output,
            settings,
        } => commands::cmd_target(&source, stage, output.as_deref(), &settings),
        Commands::DocsVersion { root } => commands::cmd_docs_version(&root),
        Commands::DocsHook {
            docs_dir,
            builder,
            script,
        } => commands::cmd_docs_hook(&docs_dir, &builder, script.as_deref()),
    }
}
