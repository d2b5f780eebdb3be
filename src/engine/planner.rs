//! Build the ordered step list from a desired state

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use declarative::ExecutionPlan;

use crate::config::{DesiredState, SystemIds};
use crate::paths::TOOLS_USER;
use crate::resource::{
    CollectData, DockerRepo, Firewall, HostSetting, MountVolume, Packages, ServiceAccount, Swap,
};

/// Step types in execution order
pub const STEP_ORDER: [&str; 9] = [
    "time_zone",
    "host_name",
    "swap",
    "docker_repo",
    "packages",
    "mount",
    "firewall",
    "user",
    "collect",
];

/// A plan plus the slot the final step fills with discovered ids
pub struct Plan {
    pub steps: ExecutionPlan,
    pub discovered: Arc<OnceLock<SystemIds>>,
}

/// Options that belong to the host rather than to the record
#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Rust architecture name used for the Docker source list
    pub arch: String,
    /// Home whose authorized_keys the service account receives
    pub admin_home: PathBuf,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            arch: std::env::consts::ARCH.to_string(),
            admin_home: crate::paths::admin_home(),
        }
    }
}

/// Lay out every step for `state`, in the fixed order
pub fn build_plan(state: &DesiredState, host: &HostOptions) -> Plan {
    let mut steps = ExecutionPlan::new();

    steps.add(Box::new(HostSetting::time_zone(&state.time_zone)));
    steps.add(Box::new(HostSetting::host_name(&state.host_name)));
    steps.add(Box::new(Swap::new(state.swap_space)));
    steps.add(Box::new(DockerRepo {
        arch: host.arch.clone(),
    }));
    steps.add(Box::new(Packages::new(&state.packages, state.upgrade)));
    for mount in &state.mounts {
        steps.add(Box::new(MountVolume::new(mount.clone())));
    }
    steps.add(Box::new(Firewall::new(&state.ssh_service)));
    steps.add(Box::new(ServiceAccount::new(TOOLS_USER, &host.admin_home)));

    let collect = CollectData::new(&state.host_name, &state.sys_admin, state.ids());
    let discovered = collect.discovered();
    steps.add(Box::new(collect));

    debug_assert!(
        steps
            .resources()
            .iter()
            .is_sorted_by_key(|r| STEP_ORDER.iter().position(|t| *t == r.resource_type())),
        "steps out of order"
    );
    log::debug!("planned {} steps", steps.len());
    Plan { steps, discovered }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mount, MountProvider};

    #[test]
    fn test_plan_follows_step_order() {
        let state = DesiredState {
            time_zone: "UTC".into(),
            host_name: "h.example.com".into(),
            mounts: vec![
                Mount::new(MountProvider::Raid, "/dev/sdb1", "/var/gd-tools"),
                Mount::new(MountProvider::Hetzner, "42", "/srv/backup"),
            ],
            ..Default::default()
        };
        let plan = build_plan(&state, &HostOptions::default());

        let types: Vec<&str> = plan
            .steps
            .resources()
            .iter()
            .map(|r| r.resource_type())
            .collect();
        let mut expected: Vec<&str> = STEP_ORDER.to_vec();
        expected.insert(5, "mount");
        assert_eq!(types, expected);

        let ids: Vec<String> = plan.steps.resources().iter().map(|r| r.id()).collect();
        assert_eq!(ids[5], "/var/gd-tools");
        assert_eq!(ids[6], "/srv/backup");
        assert!(plan.discovered.get().is_none());
    }

    #[test]
    fn test_plan_without_mounts() {
        let plan = build_plan(&DesiredState::default(), &HostOptions::default());
        assert_eq!(plan.steps.len(), STEP_ORDER.len() - 1);
    }
}
