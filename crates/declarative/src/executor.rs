//! Execution engine - applies resources one at a time, in plan order
//!
//! The first failing resource aborts the run. Resources already applied are
//! left as they are; re-running the plan is the recovery path, which works
//! because every resource checks current state before changing anything.

use crate::context::{ApplyContext, NoProgress, ProgressCallback};
use crate::planner::ExecutionPlan;
use crate::types::{ExecuteOptions, ExecuteSummary};
use anyhow::{Context, Result};
use hostkit::{CommandRunner, StateProbe};

/// Execute a plan against a host
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `ctx` - Host access and preview flag shared by every resource
/// * `progress` - Progress callback
///
/// # Returns
/// Summary of execution results, or the first error annotated with the
/// resource that raised it
pub fn execute<P: ProgressCallback>(
    plan: &ExecutionPlan,
    ctx: &mut ApplyContext,
    progress: &mut P,
) -> Result<ExecuteSummary> {
    let mut summary = ExecuteSummary::default();
    progress.on_plan_start(plan.len());

    for (index, resource) in plan.resources().iter().enumerate() {
        let id = resource.id();
        let description = resource.description();
        log::debug!("applying {} ({id})", resource.resource_type());
        progress.on_resource_start(index, &id, &description);

        let result = resource
            .apply(ctx)
            .with_context(|| format!("{description} failed"))?;

        log::info!("{id}: {result:?}");
        progress.on_resource_complete(&id, &result);
        summary.add_result(&result);
    }

    progress.on_plan_complete();
    Ok(summary)
}

/// Simple execution without progress reporting
pub fn execute_simple(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    runner: &dyn CommandRunner,
    probe: &dyn StateProbe,
) -> Result<ExecuteSummary> {
    let mut ctx = ApplyContext::new(runner, probe).with_preview(opts.preview);
    execute(plan, &mut ctx, &mut NoProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use crate::types::{ApplyResult, ResourceState};
    use hostkit::mock::MockHost;
    use std::path::Path;

    /// Installs a marker file by running `touch`
    #[derive(Debug)]
    struct TestResource {
        id: String,
    }

    impl TestResource {
        fn boxed(id: &str) -> Box<Self> {
            Box::new(Self { id: id.into() })
        }

        fn marker(&self) -> String {
            format!("/tmp/{}", self.id)
        }
    }

    impl Resource for TestResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn description(&self) -> String {
            format!("Test resource {}", self.id)
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
            if ctx.probe.exists(Path::new(&self.marker())) {
                Ok(ResourceState::present())
            } else {
                Ok(ResourceState::Absent)
            }
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::present()
        }

        fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
            if !self.needs_apply(ctx)? {
                return Ok(ApplyResult::NoChange);
            }
            ctx.run(&format!("mkdir -p {}", self.marker()))?;
            Ok(ApplyResult::Created)
        }
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        completed: usize,
        finished: bool,
    }

    impl ProgressCallback for Recorder {
        fn on_plan_start(&mut self, _total: usize) {}
        fn on_resource_start(&mut self, _index: usize, id: &str, _description: &str) {
            self.started.push(id.to_string());
        }
        fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult) {
            self.completed += 1;
        }
        fn on_plan_complete(&mut self) {
            self.finished = true;
        }
    }

    fn plan(ids: &[&str]) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        for id in ids {
            plan.add(TestResource::boxed(id));
        }
        plan
    }

    #[test]
    fn test_execute_empty_plan() {
        let host = MockHost::new();
        let summary =
            execute_simple(&ExecutionPlan::new(), &ExecuteOptions::default(), &host, &host)
                .unwrap();
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_execute_in_order_then_converged() {
        let host = MockHost::new();
        let opts = ExecuteOptions::default();
        let summary = execute_simple(&plan(&["a", "b"]), &opts, &host, &host).unwrap();
        assert_eq!(summary.created, 2);
        assert_eq!(host.executed(), vec!["mkdir -p /tmp/a", "mkdir -p /tmp/b"]);

        host.clear_records();
        let summary = execute_simple(&plan(&["a", "b"]), &opts, &host, &host).unwrap();
        assert_eq!(summary.no_change, 2);
        assert!(host.executed().is_empty());
    }

    #[test]
    fn test_execute_stops_at_first_failure() {
        let host = MockHost::new().failing_on("mkdir -p /tmp/b");
        let mut ctx = ApplyContext::new(&host, &host);
        let mut recorder = Recorder::default();

        let err = execute(&plan(&["a", "b", "c"]), &mut ctx, &mut recorder).unwrap_err();

        assert!(err.to_string().contains("Test resource b"));
        assert_eq!(recorder.started, vec!["a", "b"]);
        assert_eq!(recorder.completed, 1);
        assert!(!recorder.finished);
        assert_eq!(host.executed(), vec!["mkdir -p /tmp/a", "mkdir -p /tmp/b"]);
    }

    #[test]
    fn test_preview_changes_nothing() {
        let host = MockHost::new();
        let opts = ExecuteOptions {
            preview: true,
            ..Default::default()
        };
        let summary = execute_simple(&plan(&["a"]), &opts, &host, &host).unwrap();
        assert_eq!(summary.created, 1);
        assert!(host.executed().is_empty());
        assert_eq!(host.previewed(), vec!["mkdir -p /tmp/a"]);
    }
}
