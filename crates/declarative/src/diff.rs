//! Diff computation for resources

use crate::context::ApplyContext;
use crate::resource::Resource;
use crate::types::ResourceState;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    pub fn from_resource(resource: &dyn Resource, ctx: &ApplyContext) -> Result<Option<Self>> {
        let current = resource.current_state(ctx)?;
        let desired = resource.desired_state();

        if current == desired {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            current,
            desired,
        }))
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Modified { .. }, _)
                | (ResourceState::Present { .. }, ResourceState::Present { .. })
        )
    }
}

/// Compute diffs for a list of resources
///
/// Returns only resources whose current state differs from the desired one.
/// A failing probe aborts the whole computation.
pub fn compute_diffs(
    resources: &[Box<dyn Resource>],
    ctx: &ApplyContext,
) -> Result<Vec<ResourceDiff>> {
    let mut diffs = Vec::new();
    for resource in resources {
        let diff = ResourceDiff::from_resource(resource.as_ref(), ctx)
            .with_context(|| format!("Failed to probe {}", resource.description()))?;
        diffs.extend(diff);
    }
    Ok(diffs)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to create
    pub additions: usize,
    /// Number of resources to change
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApplyResult;
    use hostkit::mock::MockHost;
    use std::path::Path;

    #[derive(Debug)]
    struct ZoneFile(&'static str);

    impl Resource for ZoneFile {
        fn id(&self) -> String {
            "time_zone".into()
        }
        fn description(&self) -> String {
            format!("Time zone {}", self.0)
        }
        fn resource_type(&self) -> &'static str {
            "time_zone"
        }
        fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
            Ok(ResourceState::present_with(
                ctx.probe.read_line(Path::new("/etc/timezone"))?,
            ))
        }
        fn desired_state(&self) -> ResourceState {
            ResourceState::present_with(self.0)
        }
        fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
            Ok(ApplyResult::NoChange)
        }
    }

    #[test]
    fn test_compute_diffs_only_reports_drift() {
        let host = MockHost::new().with_file("/etc/timezone", "UTC\n");
        let ctx = ApplyContext::new(&host, &host);
        let resources: Vec<Box<dyn Resource>> =
            vec![Box::new(ZoneFile("UTC")), Box::new(ZoneFile("Europe/Berlin"))];

        let diffs = compute_diffs(&resources, &ctx).unwrap();
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].is_modification());

        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.modifications, 1);
        assert!(summary.has_changes());
    }

    #[test]
    fn test_compute_diffs_propagates_probe_errors() {
        let host = MockHost::new();
        let ctx = ApplyContext::new(&host, &host);
        let resources: Vec<Box<dyn Resource>> = vec![Box::new(ZoneFile("UTC"))];
        let err = compute_diffs(&resources, &ctx).unwrap_err();
        assert!(err.to_string().contains("Time zone UTC"));
    }
}
