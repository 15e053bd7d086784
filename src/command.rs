// src/command.rs

//! Structured shell commands with timeouts
//!
//! Install steps are built as [`CommandChain`]s of [`ShellCommand`]s. A chain
//! renders to a single `a && b && c` shell line, so what gets executed can be
//! inspected (and tested) before anything runs. Execution goes through
//! `sh -c` with stdin closed and a hard timeout. The shell leads its own
//! process group, and a timeout kills the whole group, so nothing the shell
//! started outlives the step.

use crate::error::{Error, Result};
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Rendered form of a command that does nothing
pub const NOOP_COMMAND: &str = "true";

/// Default timeout for build commands (the original configure used 2500-6000s)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2500);

/// Timeout for best-effort cleanup steps
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Quote a value for `sh` if it contains anything outside a safe set
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

/// A single program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a token verbatim (may contain shell syntax such as globs)
    pub fn arg(mut self, token: impl Into<String>) -> Self {
        self.args.push(token.into());
        self
    }

    /// Append several verbatim tokens
    pub fn args<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Append a path, quoted for the shell when needed
    pub fn path(mut self, path: &Path) -> Self {
        self.args.push(shell_quote(&path.to_string_lossy()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn render(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of a successful command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

/// Commands joined with `&&`, run in one shell
#[derive(Debug, Clone)]
pub struct CommandChain {
    parts: Vec<ShellCommand>,
    current_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
    timeout: Duration,
}

impl Default for CommandChain {
    fn default() -> Self {
        Self {
            parts: Vec::new(),
            current_dir: None,
            env: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CommandChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a chain from a single command
    pub fn of(command: ShellCommand) -> Self {
        Self::new().then(command)
    }

    pub fn then(mut self, command: ShellCommand) -> Self {
        self.parts.push(command);
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn parts(&self) -> &[ShellCommand] {
        &self.parts
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    /// The shell line, `cd`-prefixed when a working directory is set
    pub fn render(&self) -> String {
        let body = if self.parts.is_empty() {
            NOOP_COMMAND.to_string()
        } else {
            self.parts
                .iter()
                .map(ShellCommand::render)
                .collect::<Vec<_>>()
                .join(" && ")
        };
        match &self.current_dir {
            Some(dir) => format!("cd {} && {}", shell_quote(&dir.to_string_lossy()), body),
            None => body,
        }
    }

    /// Run the chain, failing on non-zero exit or timeout
    pub fn execute(&self) -> Result<CommandOutput> {
        let line = self.render();
        debug!("Executing: {}", line);

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&line)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        let mut child = command.spawn().map_err(|e| {
            Error::IoError(format!("Failed to spawn shell for '{}': {}", line, e))
        })?;

        // Drain both pipes so a chatty build cannot fill them and stall
        let stdout_reader = child.stdout.take().map(|s| thread::spawn(move || drain(s)));
        let stderr_reader = child.stderr.take().map(|s| thread::spawn(move || drain(s)));

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                // The group id is the shell's pid
                if let Err(e) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
                    warn!("Failed to kill process group of '{}': {}", line, e);
                    let _ = child.kill();
                }
                let _ = child.wait();
                warn!("Command timed out after {}s: {}", self.timeout.as_secs(), line);
                return Err(Error::CommandTimeout {
                    command: line,
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let stdout = stdout_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        for output_line in stdout.lines() {
            debug!("[stdout] {}", output_line);
        }
        for output_line in stderr.lines() {
            debug!("[stderr] {}", output_line);
        }

        if !status.success() {
            return Err(Error::CommandFailed {
                command: line,
                code: status.code(),
                stderr,
            });
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            code: status.code(),
        })
    }
}

fn drain(mut reader: impl Read) -> String {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/usr/local/lib"), "/usr/local/lib");
        assert_eq!(shell_quote("with space"), "'with space'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_render_chain() {
        let chain = CommandChain::of(ShellCommand::new("make").args(["-f", "Makefile.parallel", "lib"]))
            .then(ShellCommand::new("mkdir").arg("-p").path(Path::new("/opt/x/lib")))
            .current_dir("/tmp/pkg");
        assert_eq!(
            chain.render(),
            "cd /tmp/pkg && make -f Makefile.parallel lib && mkdir -p /opt/x/lib"
        );
    }

    #[test]
    fn test_empty_chain_renders_noop() {
        assert_eq!(CommandChain::new().render(), NOOP_COMMAND);
    }

    #[test]
    fn test_execute_success_captures_output() {
        let output = CommandChain::of(ShellCommand::new("echo").arg("hello"))
            .execute()
            .unwrap();
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.code, Some(0));
    }

    #[test]
    fn test_execute_failure_reports_code() {
        let err = CommandChain::of(ShellCommand::new("sh").args(["-c", "'exit 3'"]))
            .execute()
            .unwrap_err();
        match err {
            Error::CommandFailed { code, .. } => assert_eq!(code, Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_execute_timeout() {
        let err = CommandChain::of(ShellCommand::new("sleep").arg("5"))
            .timeout(Duration::from_millis(200))
            .execute()
            .unwrap_err();
        assert!(matches!(err, Error::CommandTimeout { .. }));
        assert!(err.is_invocation_failure());
    }

    #[test]
    fn test_timeout_kills_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("still-running");
        let err = CommandChain::of(ShellCommand::new("sleep").arg("2"))
            .then(ShellCommand::new("touch").path(&marker))
            .timeout(Duration::from_millis(300))
            .execute()
            .unwrap_err();
        assert!(matches!(err, Error::CommandTimeout { .. }));

        std::thread::sleep(Duration::from_secs(3));
        assert!(!marker.exists(), "timed-out chain kept running");
    }

    #[test]
    fn test_env_is_passed() {
        let output = CommandChain::of(ShellCommand::new("printf").arg("%s").arg("\"$EXTPKG_TEST\""))
            .env("EXTPKG_TEST", "value")
            .execute()
            .unwrap();
        assert_eq!(output.stdout, "value");
    }
}
