// src/install/mod.rs

//! Package install plans and their execution
//!
//! A recipe turns its formed arguments into an [`InstallPlan`]: files to
//! generate, shell steps to run, and what the package contributes to the host
//! build (make rules, macros, defines, notices). [`InstallRunner`] executes a
//! plan:
//!
//! 1. Write the generated files
//! 2. Skip everything if the recorded configuration is unchanged
//! 3. Run the steps in order; a [`StepPolicy::Tolerated`] failure is logged
//!    and ignored, a [`StepPolicy::Fatal`] one stops the install
//! 4. Record the configuration the package was built with

pub mod makefile;

pub use makefile::{ConfigFragment, MakeRule, MakefileFragment};

use crate::buildlog::BuildLog;
use crate::command::CommandChain;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happens when a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Best effort, failure is logged and the next step runs
    Tolerated,
    /// Failure aborts the install
    Fatal,
}

/// One shell step of an install
#[derive(Debug, Clone)]
pub struct InstallStep {
    pub label: String,
    pub chain: CommandChain,
    pub policy: StepPolicy,
    /// Shown before the step starts
    pub banner: Option<String>,
    /// Error reported when a fatal step fails
    pub failure_message: Option<String>,
}

impl InstallStep {
    pub fn tolerated(label: impl Into<String>, chain: CommandChain) -> Self {
        Self {
            label: label.into(),
            chain,
            policy: StepPolicy::Tolerated,
            banner: None,
            failure_message: None,
        }
    }

    pub fn fatal(label: impl Into<String>, chain: CommandChain) -> Self {
        Self {
            label: label.into(),
            chain,
            policy: StepPolicy::Fatal,
            banner: None,
            failure_message: None,
        }
    }

    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }
}

/// File written before any step runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Configuration file compared against the copy kept from the last install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedConfig {
    /// Freshly generated file in the source tree
    pub generated: PathBuf,
    /// Copy kept in the install tree (`pkg.conf.<key>`)
    pub record: PathBuf,
}

impl RecordedConfig {
    pub fn new(generated: impl Into<PathBuf>, record: impl Into<PathBuf>) -> Self {
        Self {
            generated: generated.into(),
            record: record.into(),
        }
    }

    /// An install is needed unless the record matches the generated file
    pub fn install_needed(&self) -> bool {
        match (fs::read(&self.generated), fs::read(&self.record)) {
            (Ok(generated), Ok(recorded)) => generated != recorded,
            _ => true,
        }
    }

    /// Keep the configuration the package was just built with
    pub fn post_install(&self) -> Result<()> {
        if let Some(parent) = self.record.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&self.generated, &self.record).map_err(|e| {
            Error::IoError(format!(
                "Failed to record {} as {}: {}",
                self.generated.display(),
                self.record.display(),
                e
            ))
        })?;
        Ok(())
    }
}

/// Everything needed to install one package
#[derive(Debug, Clone, Default)]
pub struct InstallPlan {
    pub files: Vec<GeneratedFile>,
    pub record: Option<RecordedConfig>,
    pub steps: Vec<InstallStep>,
    pub fragment: MakefileFragment,
    /// Boxed messages shown after a successful install
    pub notices: Vec<String>,
}

impl InstallPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_file(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.push(GeneratedFile {
            path: path.into(),
            contents: contents.into(),
        });
    }

    pub fn step(&mut self, step: InstallStep) {
        self.steps.push(step);
    }

    pub fn record(&mut self, record: RecordedConfig) {
        self.record = Some(record);
    }

    pub fn notice(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }

    pub fn file(&self, path: &Path) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Rendered shell lines, in execution order
    pub fn commands(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.chain.render()).collect()
    }
}

/// Result of running a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// Recorded configuration unchanged, nothing was run
    UpToDate,
    /// Dry run, nothing was run
    Planned,
}

/// Executes install plans, logging into a [`BuildLog`]
pub struct InstallRunner<'a> {
    log: &'a mut BuildLog,
    dry_run: bool,
}

impl<'a> InstallRunner<'a> {
    pub fn new(log: &'a mut BuildLog) -> Self {
        Self {
            log,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn run(&mut self, package: &str, plan: &InstallPlan) -> Result<InstallOutcome> {
        if self.dry_run {
            for file in &plan.files {
                self.log.line(&format!("Would write {}", file.path.display()));
            }
            for step in &plan.steps {
                self.log
                    .line(&format!("Would run [{}]: {}", step.label, step.chain.render()));
            }
            return Ok(InstallOutcome::Planned);
        }

        for file in &plan.files {
            debug!("Writing {}", file.path.display());
            if let Some(parent) = file.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&file.path, &file.contents)?;
        }

        if let Some(record) = &plan.record {
            if !record.install_needed() {
                info!("{} is up to date, skipping build", package);
                self.log.line(&format!(
                    "{}: {} unchanged, not rebuilding",
                    package,
                    record.generated.display()
                ));
                return Ok(InstallOutcome::UpToDate);
            }
        }

        for step in &plan.steps {
            self.run_step(package, step)?;
        }

        if let Some(record) = &plan.record {
            record.post_install()?;
        }
        for notice in &plan.notices {
            self.log.print_box(notice);
        }

        info!("Installed {}", package);
        Ok(InstallOutcome::Installed)
    }

    fn run_step(&mut self, package: &str, step: &InstallStep) -> Result<()> {
        if let Some(banner) = &step.banner {
            self.log.print_box(banner);
        }
        info!("{}: {}", package, step.label);

        match step.chain.execute() {
            Ok(output) => {
                self.log.output(&step.label, &output.stdout, &output.stderr);
                Ok(())
            }
            Err(e) => match step.policy {
                StepPolicy::Tolerated => {
                    warn!("{}: ignoring failed {} step: {}", package, step.label, e);
                    self.log
                        .line(&format!("=== {} (failed, ignored) ===\n{}", step.label, e));
                    Ok(())
                }
                StepPolicy::Fatal => {
                    let message = step
                        .failure_message
                        .clone()
                        .unwrap_or_else(|| format!("Error running {} on {}", step.label, package));
                    self.log.line(&format!("{}: {}", message, e));
                    self.log.error_box(package, &message);
                    Err(Error::InstallFailed {
                        package: package.to_string(),
                        message,
                    })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ShellCommand;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_tolerated_failure_does_not_stop_fatal_step() {
        let tmp = TempDir::new().unwrap();
        let marker = tmp.path().join("marker");

        let mut plan = InstallPlan::new();
        plan.step(InstallStep::tolerated(
            "cleanlib",
            CommandChain::of(ShellCommand::new("false")).timeout(Duration::from_secs(60)),
        ));
        plan.step(InstallStep::fatal(
            "lib",
            CommandChain::of(ShellCommand::new("touch").path(&marker)),
        ));

        let mut log = BuildLog::new();
        let outcome = InstallRunner::new(&mut log).run("TEST", &plan).unwrap();

        assert_eq!(outcome, InstallOutcome::Installed);
        assert!(marker.exists());
        assert!(log.as_str().contains("cleanlib (failed, ignored)"));
    }

    #[test]
    fn test_fatal_failure_reports_message() {
        let tmp = TempDir::new().unwrap();
        let after = tmp.path().join("after");

        let mut plan = InstallPlan::new();
        plan.step(
            InstallStep::fatal("lib", CommandChain::of(ShellCommand::new("false")))
                .with_failure_message("Error running make on SCALAPACK"),
        );
        plan.step(InstallStep::fatal(
            "after",
            CommandChain::of(ShellCommand::new("touch").path(&after)),
        ));

        let mut log = BuildLog::new();
        let err = InstallRunner::new(&mut log).run("SCALAPACK", &plan).unwrap_err();

        assert_eq!(err.to_string(), "Error running make on SCALAPACK");
        assert!(!after.exists());
        assert!(log.as_str().contains("ERROR in package SCALAPACK"));
    }

    #[test]
    fn test_timed_out_cleanup_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let marker = tmp.path().join("lib-built");

        let mut plan = InstallPlan::new();
        plan.step(InstallStep::tolerated(
            "cleanlib",
            CommandChain::of(ShellCommand::new("sleep").arg("5")).timeout(Duration::from_millis(200)),
        ));
        plan.step(InstallStep::fatal(
            "lib",
            CommandChain::of(ShellCommand::new("touch").path(&marker)),
        ));

        let mut log = BuildLog::new();
        let outcome = InstallRunner::new(&mut log).run("SCALAPACK", &plan).unwrap();

        assert_eq!(outcome, InstallOutcome::Installed);
        assert!(marker.exists());
        assert!(log.as_str().contains("cleanlib (failed, ignored)"));
        assert!(log.as_str().contains("timed out"));
    }

    #[test]
    fn test_timed_out_build_fails_install() {
        let tmp = TempDir::new().unwrap();
        let after = tmp.path().join("after");

        let mut plan = InstallPlan::new();
        plan.step(
            InstallStep::fatal(
                "lib",
                CommandChain::of(ShellCommand::new("sleep").arg("5")).timeout(Duration::from_millis(200)),
            )
            .with_failure_message("Error running make on SCALAPACK"),
        );
        plan.step(InstallStep::fatal(
            "after",
            CommandChain::of(ShellCommand::new("touch").path(&after)),
        ));

        let mut log = BuildLog::new();
        let err = InstallRunner::new(&mut log).run("SCALAPACK", &plan).unwrap_err();

        match &err {
            Error::InstallFailed { package, message } => {
                assert_eq!(package, "SCALAPACK");
                assert_eq!(message, "Error running make on SCALAPACK");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!after.exists());
        assert!(log.as_str().contains("timed out"));
        assert!(log.as_str().contains("ERROR in package SCALAPACK"));
    }

    #[test]
    fn test_unchanged_record_skips_steps() {
        let tmp = TempDir::new().unwrap();
        let generated = tmp.path().join("src/SLmake.inc");
        let record = tmp.path().join("prefix/lib/petsc/conf/pkg.conf.scalapack");
        let ran = tmp.path().join("ran");

        let mut plan = InstallPlan::new();
        plan.write_file(&generated, "CDEFS        = -DAdd_\n");
        plan.record(RecordedConfig::new(&generated, &record));
        plan.step(InstallStep::fatal(
            "lib",
            CommandChain::of(ShellCommand::new("touch").path(&ran)),
        ));

        let mut log = BuildLog::new();
        assert_eq!(
            InstallRunner::new(&mut log).run("SCALAPACK", &plan).unwrap(),
            InstallOutcome::Installed
        );
        assert_eq!(fs::read_to_string(&record).unwrap(), "CDEFS        = -DAdd_\n");

        fs::remove_file(&ran).unwrap();
        assert_eq!(
            InstallRunner::new(&mut log).run("SCALAPACK", &plan).unwrap(),
            InstallOutcome::UpToDate
        );
        assert!(!ran.exists());
    }

    #[test]
    fn test_dry_run_executes_nothing() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("generated");

        let mut plan = InstallPlan::new();
        plan.write_file(&file, "x");
        plan.step(InstallStep::fatal("fail", CommandChain::of(ShellCommand::new("false"))));

        let mut log = BuildLog::new();
        let outcome = InstallRunner::new(&mut log).dry_run(true).run("X", &plan).unwrap();
        assert_eq!(outcome, InstallOutcome::Planned);
        assert!(!file.exists());
        assert!(log.as_str().contains("Would run [fail]: false"));
    }
}
