//! `gd-tools system` - reconcile this host with its desired state

use anyhow::{Context as _, Result, bail};
use std::path::Path;
use std::process::Command;

use hostkit::{LocalProbe, ShellRunner};

use crate::Context;
use crate::cli::SystemArgs;
use crate::engine::{self, HostOptions, TerminalProgress};
use crate::paths;
use crate::privilege;
use crate::ui;

pub fn run(ctx: &Context, args: SystemArgs) -> Result<()> {
    let probe = LocalProbe::new();

    if paths::exec_context(&probe).is_dev() {
        let path = paths::config_path(args.config.as_deref());
        ui::info("Development machine: opening the configuration instead");
        return open_editor(&path);
    }

    privilege::require_root(privilege::effective_uid())?;

    let (path, mut state) = super::load_state(args.config.as_deref())?;
    state.preview = args.preview;
    state.progress = args.progress;
    state.upgrade = args.upgrade;
    let host = HostOptions::default();

    if !ctx.quiet {
        ui::header(&format!("Provisioning {}", state.host_name));
        ui::kv("Config", &path.display().to_string());
        ui::kv("Version", &state.version);
        if state.preview {
            ui::kv("Mode", "preview");
        }
        if ctx.verbose > 0 {
            ui::kv("Arch", &host.arch);
            ui::kv("Admin home", &host.admin_home.display().to_string());
        }
        println!();
    }

    let runner = ShellRunner::new();
    let mut progress = TerminalProgress::new(state.preview, state.progress);
    let outcome = engine::reconcile(
        state.clone(),
        &runner,
        &probe,
        &host,
        &mut progress,
    )?;

    if !state.preview && outcome.ids_changed(&state) {
        outcome.state.save(&path)?;
        ui::success(&format!("Recorded system ids in {}", path.display()));
    }

    if !ctx.quiet {
        engine::report(&outcome, state.preview);
    }
    Ok(())
}

/// Hand the terminal to `$EDITOR` (vim when unset)
fn open_editor(path: &Path) -> Result<()> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
    let status = Command::new(&editor)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to start {editor}"))?;
    if !status.success() {
        bail!("{editor} exited with {status}");
    }
    Ok(())
}
