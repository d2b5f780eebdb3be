//! Resource trait for declarative state management
//!
//! A Resource represents something on the host that can be in a certain state,
//! and can be changed to reach a desired state.

use crate::context::ApplyContext;
use crate::types::{ApplyResult, ResourceState};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Every provisioning step implements this trait, which provides:
/// - Identity (id, description, type)
/// - State detection (current vs desired), read-only through `ctx.probe`
/// - State convergence (apply), mutating only through `ctx`
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};
/// use std::path::Path;
///
/// #[derive(Debug)]
/// struct HostName(String);
///
/// impl Resource for HostName {
///     fn id(&self) -> String { "host_name".into() }
///     fn description(&self) -> String { format!("Host name {}", self.0) }
///     fn resource_type(&self) -> &'static str { "host_name" }
///
///     fn current_state(&self, ctx: &ApplyContext) -> anyhow::Result<ResourceState> {
///         Ok(ResourceState::present_with(ctx.probe.read_line(Path::new("/etc/hostname"))?))
///     }
///
///     fn desired_state(&self) -> ResourceState {
///         ResourceState::present_with(self.0.clone())
///     }
///
///     fn apply(&self, ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
///         if !self.needs_apply(ctx)? {
///             return Ok(ApplyResult::NoChange);
///         }
///         ctx.run(&format!("hostnamectl set-hostname {}", self.0))?;
///         Ok(ApplyResult::Modified)
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identifier for this resource
    ///
    /// Stable within its type. Examples:
    /// - "time_zone"
    /// - "/var/gd-tools" for a mount
    /// - "gd-tools" for the service account
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category, used for grouping and filtering
    fn resource_type(&self) -> &'static str;

    /// Detect the current state of this resource
    ///
    /// Must not change the host.
    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState>;

    /// Get the desired state for this resource
    fn desired_state(&self) -> ResourceState;

    /// Check if the resource needs changes to reach desired state
    ///
    /// Default implementation compares current and desired states.
    fn needs_apply(&self, ctx: &ApplyContext) -> Result<bool> {
        let current = self.current_state(ctx)?;
        Ok(current != self.desired_state())
    }

    /// Apply changes to reach the desired state
    ///
    /// This method should:
    /// 1. Check if already in desired state (return NoChange)
    /// 2. Route every change through `ctx` so preview mode holds
    /// 3. Return the appropriate ApplyResult
    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;
