//! # hostkit
//!
//! The effect boundary between host provisioning logic and a live Linux host.
//!
//! - [`CommandRunner`]: the single chokepoint for side-effecting command lines,
//!   with a preview mode that only echoes them
//! - [`StateProbe`]: read-only queries (files, markers, accounts, downloads)
//!   plus the guarded line append and file write used for config edits
//! - [`mock::MockHost`]: a simulated host implementing both traits, recording
//!   every command so tests can assert exact sequences
//!
//! ## Example
//!
//! ```no_run
//! use hostkit::{CommandRunner, LocalProbe, ShellRunner, StateProbe};
//! use std::path::Path;
//!
//! let runner = ShellRunner::new();
//! let probe = LocalProbe::new();
//!
//! let zone = probe.read_line(Path::new("/etc/timezone")).unwrap();
//! if zone != "Europe/Berlin" {
//!     runner.run("timedatectl set-timezone Europe/Berlin", true).unwrap();
//! }
//! ```

#![warn(clippy::all)]

pub mod accounts;
pub mod error;
pub mod mock;
pub mod probe;
pub mod runner;

pub use accounts::Account;
pub use error::{Error, ErrorCategory, Result};
pub use probe::{LocalProbe, StateProbe};
pub use runner::{CommandOutput, CommandRunner, ShellRunner, split_command};
