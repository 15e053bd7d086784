// src/commands/docs.rs

//! Documentation build commands

use anyhow::Result;
use extpkg::docs::{self, Builder, RecordingApp, TeamTableGenerator, hooks};
use std::path::Path;
use tracing::info;

pub fn cmd_docs_version(root: &Path) -> Result<()> {
    let version = docs::project_version(root)?;
    println!("version = {}", version.version);
    println!("release = {}", version.release);
    Ok(())
}

pub fn cmd_docs_hook(docs_dir: &Path, builder: &str, script: Option<&Path>) -> Result<()> {
    let mut generator = TeamTableGenerator::new(docs_dir);
    if let Some(script) = script {
        generator = generator.with_script("python3", script);
    }

    let mut app = RecordingApp::new();
    docs::setup(&mut app, generator);
    for css in app.css_files() {
        println!("css: {}", css);
    }

    let ran = app.emit(
        hooks::BUILDER_INITED,
        &Builder {
            name: builder.to_string(),
        },
    )?;
    info!("Ran {} {} handler(s)", ran, hooks::BUILDER_INITED);
    println!(
        "Generated team table in {}",
        docs_dir.join(hooks::GENERATED_DIR).display()
    );
    Ok(())
}
