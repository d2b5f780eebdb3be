//! Reconciliation run with terminal output

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use declarative::{ApplyContext, ApplyResult, ExecuteSummary, ProgressCallback, execute};
use hostkit::{CommandRunner, StateProbe};

use super::planner::{HostOptions, build_plan};
use crate::config::DesiredState;
use crate::ui;

/// Prints one line per step, or drives a progress bar with `--progress`
pub struct TerminalProgress {
    preview: bool,
    show_bar: bool,
    total: usize,
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    pub fn new(preview: bool, show_bar: bool) -> Self {
        Self {
            preview,
            show_bar,
            total: 0,
            bar: None,
        }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_plan_start(&mut self, total: usize) {
        self.total = total;
        if self.show_bar {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓░"),
            );
            self.bar = Some(bar);
        }
    }

    fn on_resource_start(&mut self, index: usize, _id: &str, description: &str) {
        match &self.bar {
            Some(bar) => bar.set_message(description.to_string()),
            None => ui::step(index + 1, self.total, description),
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        match &self.bar {
            Some(bar) => {
                let (symbol, label) = ui::result_label(result, self.preview);
                bar.println(format!("  {symbol} {id}: {label}"));
                bar.inc(1);
            }
            None => ui::step_result(id, result, self.preview),
        }
    }

    fn on_plan_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        // A failed step never reaches on_plan_complete
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
    }
}

/// What a run produced
#[derive(Debug)]
pub struct Outcome {
    /// The input record, with discovered ids applied
    pub state: DesiredState,
    pub summary: ExecuteSummary,
}

impl Outcome {
    /// Whether the record differs from what was loaded
    pub fn ids_changed(&self, before: &DesiredState) -> bool {
        self.state.ids() != before.ids()
    }
}

/// Converge the host toward `state`, stopping at the first failing step
///
/// The record is consumed and handed back, updated, in the outcome.
pub fn reconcile<P: ProgressCallback>(
    state: DesiredState,
    runner: &dyn CommandRunner,
    probe: &dyn StateProbe,
    host: &HostOptions,
    progress: &mut P,
) -> Result<Outcome> {
    state.validate()?;

    let plan = build_plan(&state, host);
    let mut ctx = ApplyContext::new(runner, probe).with_preview(state.preview);

    if state.preview {
        log::info!("preview run: commands are echoed, not executed");
    }

    let summary = execute(&plan.steps, &mut ctx, progress)?;

    let state = match plan.discovered.get() {
        Some(ids) => state.with_ids(*ids),
        None => state,
    };
    Ok(Outcome { state, summary })
}

/// Print the outcome of a finished run
pub fn report(outcome: &Outcome, preview: bool) {
    ui::summary(&outcome.summary, preview);
    if preview {
        println!("  {} Preview only, nothing was changed", "ℹ".blue());
    }
}
