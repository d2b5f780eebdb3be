//! Command execution chokepoint.
//!
//! Every side effect the provisioning steps cause on the host is a single
//! command line handed to a [`CommandRunner`]. In preview mode the runner only
//! echoes the line, which is what makes a whole reconciliation run side-effect
//! free.

use crate::error::{Error, Result};
use regex::Regex;
use std::process::{Command, Output, Stdio};

/// Captured output of a probe command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        }
    }
}

impl CommandOutput {
    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Stdout followed by stderr
    pub fn combined(&self) -> String {
        let mut text = self.stdout_str();
        text.push_str(&self.stderr_str());
        text
    }
}

/// Executes external command lines.
///
/// `run` is the only method allowed to change the host. The remaining methods
/// are probes: they always execute, also in preview mode, and must only be
/// given read-only commands.
pub trait CommandRunner: Send + Sync {
    /// Run a command, or only echo it when `preview` is set.
    fn run(&self, command: &str, preview: bool) -> Result<()>;

    /// Run a read-only command and capture its output, whatever the exit status.
    fn output(&self, command: &str) -> Result<CommandOutput>;

    /// Run a read-only command and report whether its combined output matches.
    ///
    /// Fails when the command itself fails.
    fn matches(&self, command: &str, pattern: &Regex) -> Result<bool> {
        let output = self.output(command)?;
        if !output.success {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status: "non-zero exit".to_string(),
                stderr: output.stderr_str().trim().to_string(),
            });
        }
        Ok(pattern.is_match(&output.combined()))
    }

    /// Run a read-only command and return its trimmed stdout.
    fn capture(&self, command: &str) -> Result<String> {
        let output = self.output(command)?;
        if !output.success {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status: "non-zero exit".to_string(),
                stderr: output.stderr_str().trim().to_string(),
            });
        }
        Ok(output.stdout_str().trim().to_string())
    }

    /// Run a read-only command, returning only whether it succeeded.
    fn succeeds(&self, command: &str) -> bool {
        self.output(command).map(|o| o.success).unwrap_or(false)
    }
}

/// Split a command line into program and arguments.
///
/// Command lines are split on whitespace only; there is no shell and no
/// quoting.
pub fn split_command(command: &str) -> Result<(&str, Vec<&str>)> {
    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or(Error::EmptyCommand)?;
    Ok((program, parts.collect()))
}

/// Runner that executes commands on the local machine
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }

    fn prepare(command: &str) -> Result<Command> {
        let (program, args) = split_command(command)?;
        let mut cmd = Command::new(program);
        cmd.args(args).env("LANG", "C").env("LC_ALL", "C");
        Ok(cmd)
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, preview: bool) -> Result<()> {
        let mut cmd = Self::prepare(command)?;

        if preview {
            log::info!("preview: {command}");
            println!("  [preview] {command}");
            return Ok(());
        }

        log::info!("running: {command}");
        println!("  → {command}");

        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| Error::Spawn {
                command: command.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status: status.to_string(),
                stderr: String::new(),
            });
        }

        Ok(())
    }

    fn output(&self, command: &str) -> Result<CommandOutput> {
        log::debug!("probe: {command}");
        let output = Self::prepare(command)?
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::Spawn {
                command: command.to_string(),
                source,
            })?;
        Ok(output.into())
    }
}
