//! Execution planner - an ordered list of resources

use crate::resource::{BoxedResource, Resource};

/// An execution plan: resources in the order they must be applied
#[derive(Default)]
pub struct ExecutionPlan {
    resources: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource; it runs after everything added before it
    pub fn add(&mut self, resource: BoxedResource) {
        self.resources.push(resource);
    }

    /// Resources in execution order
    pub fn resources(&self) -> &[BoxedResource] {
        &self.resources
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            resources: self
                .resources
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type:id"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Parse a target string like "type:id" into (type, id)
///
/// Ids contain dots and slashes (`/var/gd-tools`), so the separator is `:`.
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once(':') {
        Some(("", id)) => (None, Some(id.to_string())),
        Some((resource_type, id)) => (Some(resource_type.to_string()), Some(id.to_string())),
        None => (Some(target.to_string()), None),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(
    resource: &dyn Resource,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let matches_type = match rt {
            "mounts" | "volumes" => resource.resource_type() == "mount",
            "ufw" => resource.resource_type() == "firewall",
            "apt" => resource.resource_type() == "packages",
            _ => resource.resource_type() == rt || resource.resource_type().starts_with(rt),
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.id().contains(n)
    {
        return false;
    }

    true
}
