//! Reconciliation engine
//!
//! The engine:
//! 1. Plans - lays out the steps for a desired state, in fixed order
//! 2. Diffs - compares each step's current and desired state
//! 3. Executes - applies steps one by one, stopping at the first failure

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{TerminalProgress, reconcile, report};
pub use planner::{HostOptions, build_plan};
