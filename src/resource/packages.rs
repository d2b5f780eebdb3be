//! OS package resource
//!
//! Packages install strictly in declared order; a later package's maintainer
//! scripts may rely on an earlier one.

use anyhow::Result;

use super::{ApplyContext, ApplyResult, Resource, ResourceState};

/// Services that must be enabled and running once packages are in
pub const SERVICES: [&str; 2] = ["ssh", "docker"];

/// Whether dpkg reports `name` as fully installed
pub fn is_installed(ctx: &ApplyContext, name: &str) -> Result<bool> {
    let output = ctx
        .runner
        .output(&format!("dpkg-query -W -f=${{Status}} {name}"))?;
    Ok(output.success && output.stdout_str().contains("install ok installed"))
}

/// Whether systemd reports `service` as active
pub fn is_active(ctx: &ApplyContext, service: &str) -> bool {
    ctx.runner
        .succeeds(&format!("systemctl is-active {service}"))
}

/// The declared package list plus the core services
#[derive(Debug, Clone)]
pub struct Packages {
    pub names: Vec<String>,
    /// Refresh and upgrade everything first
    pub upgrade: bool,
}

impl Packages {
    pub fn new(names: &[String], upgrade: bool) -> Self {
        Self {
            names: names.to_vec(),
            upgrade,
        }
    }

    fn missing(&self, ctx: &ApplyContext) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for name in &self.names {
            if !is_installed(ctx, name)? {
                missing.push(name.clone());
            }
        }
        Ok(missing)
    }
}

impl Resource for Packages {
    fn id(&self) -> String {
        "packages".to_string()
    }

    fn description(&self) -> String {
        format!("{} packages, {} services", self.names.len(), SERVICES.len())
    }

    fn resource_type(&self) -> &'static str {
        "packages"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        let mut missing = self.missing(ctx)?;
        missing.extend(
            SERVICES
                .iter()
                .filter(|s| !is_active(ctx, s))
                .map(|s| format!("{s}.service")),
        );
        if missing.is_empty() {
            Ok(ResourceState::present())
        } else {
            Ok(ResourceState::Modified {
                from: format!("missing {}", missing.join(", ")),
                to: "all installed and running".to_string(),
            })
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let mut changed = false;
        let mut refreshed = false;

        if self.upgrade {
            ctx.run_all(&["apt-get update", "apt-get upgrade -y"])?;
            refreshed = true;
            changed = true;
        }

        for name in &self.names {
            if is_installed(ctx, name)? {
                log::info!("{name} is already installed");
                continue;
            }
            // One index refresh, and only when something is missing
            if !refreshed {
                ctx.run("apt-get update")?;
                refreshed = true;
            }
            ctx.run(&format!("apt-get install -y {name}"))?;
            changed = true;
        }

        for service in SERVICES {
            if is_active(ctx, service) {
                log::info!("{service} is active");
                continue;
            }
            ctx.run(&format!("systemctl enable --now {service}"))?;
            changed = true;
        }

        Ok(if changed {
            ApplyResult::Modified
        } else {
            ApplyResult::NoChange
        })
    }
}
