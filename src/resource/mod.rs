//! Provisioning steps
//!
//! Every step is a [`Resource`] that probes the host through the context,
//! compares against one part of the desired state, and changes the host only
//! through `ctx.run`, `ctx.append_line` and `ctx.write_file`. That keeps each
//! step idempotent and keeps preview mode free of side effects.

pub mod collect;
pub mod docker_repo;
pub mod firewall;
pub mod mounts;
pub mod packages;
pub mod setting;
pub mod swap;
pub mod user;

pub use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};

pub use collect::CollectData;
pub use docker_repo::DockerRepo;
pub use firewall::Firewall;
pub use mounts::MountVolume;
pub use packages::Packages;
pub use setting::HostSetting;
pub use swap::Swap;
pub use user::ServiceAccount;

use anyhow::Result;
use std::path::Path;

/// Path of the filesystem table
pub const FSTAB: &str = "/etc/fstab";

/// Read a file, mapping "does not exist" to `None`
pub fn read_optional(ctx: &ApplyContext, path: &str) -> Result<Option<String>> {
    match ctx.probe.read_to_string(Path::new(path)) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Created when nothing was there before, Modified otherwise
pub fn change_result(was_absent: bool) -> ApplyResult {
    if was_absent {
        ApplyResult::Created
    } else {
        ApplyResult::Modified
    }
}
