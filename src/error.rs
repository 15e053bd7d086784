// src/error.rs

//! Error types for the extpkg configure layer

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while declaring, probing, formatting or installing packages
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("invalid configure option: {0}")]
    InvalidOption(String),

    #[error("unknown package: {0}")]
    UnknownPackage(String),

    /// A formatter or installer asked for a dependency it never declared
    #[error("package {package} did not declare a dependency on {dependency}")]
    MissingDependency { package: String, dependency: String },

    /// A required dependency was consumed but probing did not find it
    #[error("package {package} requires {dependency}, which was not found")]
    RequiredDependencyMissing { package: String, dependency: String },

    #[error("package {package}: invalid state transition {from} -> {to}")]
    InvalidTransition {
        package: String,
        from: String,
        to: String,
    },

    #[error("dependency resolution failed: {0}")]
    ResolutionError(String),

    #[error("package {package} does not support {precision} precision")]
    UnsupportedPrecision { package: String, precision: String },

    #[error("package {package} needs a {language} compiler, none is configured")]
    MissingCompiler { package: String, language: String },

    #[error("required tool not found: {0}")]
    ToolNotFound(String),

    #[error("command failed with exit code {code:?}: {command}\nstderr: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("command timed out after {seconds} seconds: {command}")]
    CommandTimeout { command: String, seconds: u64 },

    /// Fatal failure of a package build/install step
    #[error("{message}")]
    InstallFailed { package: String, message: String },

    #[error("download failed: {0}")]
    DownloadError(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for failures of a spawned command (non-zero exit or timeout)
    pub fn is_invocation_failure(&self) -> bool {
        matches!(self, Self::CommandFailed { .. } | Self::CommandTimeout { .. })
    }
}
