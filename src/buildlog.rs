// src/buildlog.rs

//! Plain-text configure log
//!
//! Everything a run does is accumulated here as well as traced, so the full
//! output of every build command ends up in one file next to the generated
//! configuration.

use crate::error::Result;
use std::fs;
use std::path::Path;
use tracing::{error, info};

const BOX_WIDTH: usize = 79;

/// Frame a message between two rules of `ch`
pub fn boxed(message: &str, ch: char) -> String {
    let rule: String = std::iter::repeat_n(ch, BOX_WIDTH).collect();
    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    for line in message.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&rule);
    out
}

/// Accumulated log of one configure run
#[derive(Debug, Default, Clone)]
pub struct BuildLog {
    text: String,
}

impl BuildLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// Command output under a `=== label ===` header
    pub fn output(&mut self, label: &str, stdout: &str, stderr: &str) {
        self.line(&format!("=== {} ===", label));
        if !stdout.is_empty() {
            self.text.push_str(stdout);
            self.text.push('\n');
        }
        if !stderr.is_empty() {
            self.text.push_str(stderr);
            self.text.push('\n');
        }
    }

    /// Message shown to the user in a box
    pub fn print_box(&mut self, message: &str) {
        let framed = boxed(message, '=');
        for line in framed.lines() {
            info!("{}", line);
        }
        self.line(&framed);
    }

    /// Fatal message in a starred box with the package name as title
    pub fn error_box(&mut self, package: &str, message: &str) {
        let framed = boxed(&format!("ERROR in package {}\n{}", package, message), '*');
        for line in framed.lines() {
            error!("{}", line);
        }
        self.line(&framed);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &self.text)?;
        Ok(())
    }
}
