//! `gd-tools diff` - show what `system` would change, without changing it

use anyhow::Result;

use declarative::{ApplyContext, DiffSummary, compute_diffs};
use hostkit::{LocalProbe, ShellRunner};

use crate::Context;
use crate::cli::DiffArgs;
use crate::engine::{HostOptions, build_plan, differ};
use crate::ui;

pub fn run(ctx: &Context, args: DiffArgs) -> Result<()> {
    let (_, state) = super::load_state(args.config.as_deref())?;
    state.validate()?;

    let plan = build_plan(&state, &HostOptions::default());
    let steps = plan.steps.filter_by_target(args.target.as_deref());
    if steps.is_empty() {
        ui::warn("No step matches that target");
        return Ok(());
    }

    let runner = ShellRunner::new();
    let probe = LocalProbe::new();
    let probe_ctx = ApplyContext::new(&runner, &probe).with_preview(true);

    if !ctx.quiet {
        ui::header(&format!("Diff for {}", state.host_name));
    }

    let diffs = compute_diffs(steps.resources(), &probe_ctx)?;
    differ::display_diff(&diffs);

    let summary = DiffSummary::from_diffs(&diffs);
    if summary.has_changes() && !ctx.quiet {
        println!();
        ui::dim("Run `gd-tools system` as root to apply.");
    }
    Ok(())
}
