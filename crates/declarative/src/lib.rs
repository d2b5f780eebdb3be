//! # Declarative
//!
//! A framework for declarative host state management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, and converging a host to match it.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed (a setting, a
//!   package set, a mount, an account)
//! - **ResourceState**: The current or desired state of a resource
//! - **ApplyContext**: Host access (runner + probe) and the preview flag
//! - **ExecutionPlan**: Resources in the order they must be applied
//! - **Executor**: Applies a plan sequentially, stopping at the first failure
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecuteOptions, ExecutionPlan, execute_simple};
//! use hostkit::{LocalProbe, ShellRunner};
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add(Box::new(HostName("example.com".into())));
//!
//! let opts = ExecuteOptions { preview: true, ..Default::default() };
//! let summary = execute_simple(&plan, &opts, &ShellRunner::new(), &LocalProbe::new())?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`hostkit::CommandRunner`] and [`hostkit::StateProbe`]: host access,
//!   injected through [`ApplyContext`]
//! - [`ProgressCallback`]: Receives progress updates
//!
//! This keeps the crate free of hard dependencies on a UI or on a real host.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyContext, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs};
pub use executor::{execute, execute_simple};
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Resource};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, ResourceState};
