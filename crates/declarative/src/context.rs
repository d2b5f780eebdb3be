//! Apply context and progress callbacks
//!
//! Resources never touch the host directly. They read through the probe and
//! change things through the runner held by [`ApplyContext`], which is what
//! lets a whole plan run in preview mode or against a simulated host.

use crate::types::ApplyResult;
use anyhow::{Context, Result};
use hostkit::{CommandRunner, StateProbe};
use regex::Regex;
use std::path::Path;

/// Progress callback for execution operations
pub trait ProgressCallback {
    /// Called before a plan starts
    fn on_plan_start(&mut self, total: usize);

    /// Called when starting to apply a single resource
    fn on_resource_start(&mut self, index: usize, id: &str, description: &str);

    /// Called when a resource application completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult);

    /// Called after the last resource
    fn on_plan_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_plan_start(&mut self, _total: usize) {}
    fn on_resource_start(&mut self, _index: usize, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult) {}
    fn on_plan_complete(&mut self) {}
}

/// Context passed to resource probe and apply operations
pub struct ApplyContext<'a> {
    /// Report instead of change
    pub preview: bool,
    pub runner: &'a dyn CommandRunner,
    pub probe: &'a dyn StateProbe,
}

impl<'a> ApplyContext<'a> {
    /// Create a new apply context
    pub fn new(runner: &'a dyn CommandRunner, probe: &'a dyn StateProbe) -> Self {
        Self {
            preview: false,
            runner,
            probe,
        }
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Run (or in preview, echo) one mutating command.
    pub fn run(&self, command: &str) -> Result<()> {
        self.runner
            .run(command, self.preview)
            .with_context(|| format!("Command failed: {command}"))
    }

    /// Run commands in order, stopping at the first failure.
    pub fn run_all<S: AsRef<str>>(&self, commands: &[S]) -> Result<()> {
        for command in commands {
            self.run(command.as_ref())?;
        }
        Ok(())
    }

    /// Guarded append of a line to a host file.
    ///
    /// In preview the guard is still checked (read-only) and the append is
    /// reported instead of performed. Returns whether the line was (or would be)
    /// added.
    pub fn append_line(&self, path: &Path, guard: &Regex, line: &str) -> Result<bool> {
        if self.preview {
            let present = match self.probe.read_to_string(path) {
                Ok(content) => content.lines().any(|l| guard.is_match(l)),
                Err(e) if e.is_not_found() => false,
                Err(e) => return Err(e.into()),
            };
            if !present {
                log::info!("preview: append to {}: {line}", path.display());
                println!("  [preview] {} += {line}", path.display());
            }
            return Ok(!present);
        }

        let changed = self
            .probe
            .append_line(path, guard, line)
            .with_context(|| format!("Failed to update {}", path.display()))?;
        if changed {
            log::info!("appended to {}: {line}", path.display());
        }
        Ok(changed)
    }

    /// Write (or in preview, report) a whole host file.
    pub fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()> {
        if self.preview {
            log::info!("preview: write {} ({mode:o})", path.display());
            println!("  [preview] write {} (mode {mode:o})", path.display());
            return Ok(());
        }

        self.probe
            .write_file(path, contents, mode)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostkit::mock::MockHost;

    #[test]
    fn test_preview_run_is_echo_only() {
        let host = MockHost::new();
        let ctx = ApplyContext::new(&host, &host).with_preview(true);
        ctx.run_all(&["timedatectl set-timezone UTC", "hostnamectl set-hostname a.b"])
            .unwrap();
        assert!(host.executed().is_empty());
        assert_eq!(host.previewed().len(), 2);
    }

    #[test]
    fn test_run_all_stops_at_failure() {
        let host = MockHost::new().failing_on("mkswap /swap.img");
        let ctx = ApplyContext::new(&host, &host);
        let err = ctx
            .run_all(&["chmod 600 /swap.img", "mkswap /swap.img", "swapon /swap.img"])
            .unwrap_err();
        assert!(err.to_string().contains("mkswap /swap.img"));
        assert_eq!(host.executed(), vec!["chmod 600 /swap.img", "mkswap /swap.img"]);
    }

    #[test]
    fn test_append_line_preview_reports_without_writing() {
        let host = MockHost::new();
        let ctx = ApplyContext::new(&host, &host).with_preview(true);
        let guard = Regex::new("1234-ABCD").unwrap();
        let added = ctx
            .append_line(Path::new("/etc/fstab"), &guard, "UUID=1234-ABCD /data ext4 defaults 0 0")
            .unwrap();
        assert!(added);
        assert!(host.writes().is_empty());
        assert_eq!(host.file("/etc/fstab").as_deref(), Some(""));
    }

    #[test]
    fn test_append_line_applies() {
        let host = MockHost::new();
        let ctx = ApplyContext::new(&host, &host);
        let guard = Regex::new("1234-ABCD").unwrap();
        let line = "UUID=1234-ABCD /data ext4 defaults 0 0";
        assert!(ctx.append_line(Path::new("/etc/fstab"), &guard, line).unwrap());
        assert!(!ctx.append_line(Path::new("/etc/fstab"), &guard, line).unwrap());
        assert_eq!(host.file("/etc/fstab").unwrap(), format!("{line}\n"));
    }
}
