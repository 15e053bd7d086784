// src/docs/hooks.rs

//! Documentation builder hooks
//!
//! The documentation generator calls `setup` once with its application
//! object; the hook registers a `builder-inited` callback that regenerates
//! the team table and adds the site stylesheets.

use crate::buildlog::boxed;
use crate::command::{CommandChain, ShellCommand};
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const BUILDER_INITED: &str = "builder-inited";

/// Stylesheets added on top of whatever the theme registers
pub const CSS_FILES: [&str; 2] = ["css/pop-up.css", "css/petsc-team-container.css"];

/// Optional token giving the generator access to private group data
pub const TOKEN_ENV: &str = "PETSC_GITLAB_PRIVATE_TOKEN";

pub const GENERATED_DIR: &str = "generated";

/// The builder a callback runs for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Builder {
    pub name: String,
}

pub type Handler = Box<dyn Fn(&Builder) -> Result<()>>;

/// The part of the documentation application a hook talks to
pub trait DocsApp {
    fn connect(&mut self, event: &str, handler: Handler);
    fn add_css_file(&mut self, path: &str);
}

/// Application that records registrations and replays events
#[derive(Default)]
pub struct RecordingApp {
    handlers: Vec<(String, Handler)>,
    css_files: Vec<String>,
}

impl RecordingApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn css_files(&self) -> &[String] {
        &self.css_files
    }

    pub fn events(&self) -> Vec<&str> {
        self.handlers.iter().map(|(e, _)| e.as_str()).collect()
    }

    /// Run every handler connected to `event`, returning how many ran
    pub fn emit(&self, event: &str, builder: &Builder) -> Result<usize> {
        let mut count = 0;
        for (_, handler) in self.handlers.iter().filter(|(e, _)| e == event) {
            handler(builder)?;
            count += 1;
        }
        Ok(count)
    }
}

impl DocsApp for RecordingApp {
    fn connect(&mut self, event: &str, handler: Handler) {
        self.handlers.push((event.to_string(), handler));
    }

    fn add_css_file(&mut self, path: &str) {
        self.css_files.push(path.to_string());
    }
}

/// Runs the team table generator script
#[derive(Debug, Clone)]
pub struct TeamTableGenerator {
    interpreter: String,
    script: PathBuf,
    docs_dir: PathBuf,
}

impl TeamTableGenerator {
    /// Generator at `<docs dir>/ext/genteamtable.py`
    pub fn new(docs_dir: impl Into<PathBuf>) -> Self {
        let docs_dir = docs_dir.into();
        Self {
            interpreter: "python3".to_string(),
            script: docs_dir.join("ext").join("genteamtable.py"),
            docs_dir,
        }
    }

    pub fn with_script(mut self, interpreter: &str, script: impl Into<PathBuf>) -> Self {
        self.interpreter = interpreter.to_string();
        self.script = script.into();
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.docs_dir.join(GENERATED_DIR)
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// The generator invocation; the token travels in the environment
    pub fn command(&self, builder: &str, token: Option<&str>) -> CommandChain {
        let chain = CommandChain::of(
            ShellCommand::new(self.interpreter.as_str())
                .path(&self.script)
                .path(&self.output_dir())
                .arg(crate::command::shell_quote(builder)),
        )
        .timeout(Duration::from_secs(600));
        match token {
            Some(token) => chain.env(TOKEN_ENV, token),
            None => chain,
        }
    }

    pub fn run(&self, builder: &str) -> Result<()> {
        for line in boxed("GENERATING TEAM TABLE", '=').lines() {
            info!("{}", line);
        }
        fs::create_dir_all(self.output_dir())?;
        let token = std::env::var(TOKEN_ENV).ok();
        let output = self.command(builder, token.as_deref()).execute()?;
        debug!("team table generator: {}", output.stdout.trim());
        Ok(())
    }
}

/// Register the hook with the documentation application
pub fn setup(app: &mut dyn DocsApp, generator: TeamTableGenerator) {
    app.connect(
        BUILDER_INITED,
        Box::new(move |builder: &Builder| generator.run(&builder.name)),
    );
    for css in CSS_FILES {
        app.add_css_file(css);
    }
}
