//! Service account resource
//!
//! The `gd-tools` account runs deployments: it needs docker access, the
//! administrator's SSH keys, and its data and log roots.

use anyhow::Result;
use hostkit::Account;
use std::path::{Path, PathBuf};

use super::{ApplyContext, ApplyResult, Resource, ResourceState, read_optional};
use crate::error::ProvisionError;
use crate::paths::{DATA_ROOT, DOCKER_GROUP, ENV_MARKER};

const ENV_LABEL: &str = "prod\n";

#[derive(Debug, Clone)]
pub struct ServiceAccount {
    pub name: String,
    /// Home of the account whose authorized_keys are copied
    pub admin_home: PathBuf,
}

impl ServiceAccount {
    pub fn new(name: &str, admin_home: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            admin_home: admin_home.into(),
        }
    }

    fn default_home(&self) -> PathBuf {
        Path::new("/home").join(&self.name)
    }

    /// Data and log roots, owned by the account
    pub fn data_dirs() -> [String; 2] {
        [format!("{DATA_ROOT}/volumes"), format!("{DATA_ROOT}/logs")]
    }

    fn install_dir(&self, mode: &str, path: &str) -> String {
        format!("install -o {0} -g {0} -m {mode} -d {path}", self.name)
    }

    /// Everything that is not yet as it should be
    fn drift(&self, ctx: &ApplyContext) -> Result<Vec<String>> {
        let mut drift = Vec::new();
        if read_optional(ctx, ENV_MARKER)?.as_deref() != Some(ENV_LABEL) {
            drift.push(format!("{ENV_MARKER} not prod"));
        }
        let account = ctx.probe.account(&self.name)?;
        let Some(account) = account else {
            drift.push(format!("no account {}", self.name));
            return Ok(drift);
        };
        if !account.in_group(DOCKER_GROUP) {
            drift.push(format!("not in {DOCKER_GROUP}"));
        }
        if !ctx.probe.exists(&account.home.join(".ssh/authorized_keys")) {
            drift.push("no authorized_keys".into());
        }
        for dir in Self::data_dirs() {
            if !ctx.probe.exists(Path::new(&dir)) {
                drift.push(format!("no {dir}"));
            }
        }
        Ok(drift)
    }

    /// Create the account if needed and return it
    ///
    /// In preview the account is not created, so `None` means "would be new".
    fn ensure_account(&self, ctx: &ApplyContext) -> Result<(Option<Account>, bool)> {
        if let Some(account) = ctx.probe.account(&self.name)? {
            return Ok((Some(account), false));
        }

        ctx.run(&format!("useradd -r -m -s /bin/bash {}", self.name))?;
        if ctx.preview {
            return Ok((None, true));
        }

        let account = ctx
            .probe
            .account(&self.name)?
            .ok_or_else(|| ProvisionError::AccountMissing(self.name.clone()))?;
        log::info!("created {} with uid {}", account.name, account.uid);
        Ok((Some(account), true))
    }
}

impl Resource for ServiceAccount {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        format!("Service account {}", self.name)
    }

    fn resource_type(&self) -> &'static str {
        "user"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        let drift = self.drift(ctx)?;
        if drift.is_empty() {
            Ok(ResourceState::present())
        } else if drift.iter().any(|d| d.starts_with("no account")) {
            Ok(ResourceState::Absent)
        } else {
            Ok(ResourceState::Modified {
                from: drift.join(", "),
                to: "ready".into(),
            })
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let mut changed = false;

        if read_optional(ctx, ENV_MARKER)?.as_deref() != Some(ENV_LABEL) {
            ctx.write_file(Path::new(ENV_MARKER), ENV_LABEL.as_bytes(), 0o444)?;
            changed = true;
        }

        let (account, created) = self.ensure_account(ctx)?;
        changed |= created;

        if !account.as_ref().is_some_and(|a| a.in_group(DOCKER_GROUP)) {
            ctx.run(&format!("usermod -aG {DOCKER_GROUP} {}", self.name))?;
            changed = true;
        }

        let home = account.map_or_else(|| self.default_home(), |a| a.home);
        let ssh_dir = home.join(".ssh");
        if !ctx.probe.exists(&ssh_dir.join("authorized_keys")) {
            let keys = self.admin_home.join(".ssh/authorized_keys");
            ctx.run_all(&[
                self.install_dir("700", &ssh_dir.display().to_string()),
                format!(
                    "install -o {0} -g {0} -m 600 {1} {2}",
                    self.name,
                    keys.display(),
                    ssh_dir.display()
                ),
            ])?;
            changed = true;
        }

        for dir in Self::data_dirs() {
            if !ctx.probe.exists(Path::new(&dir)) {
                ctx.run(&self.install_dir("755", &dir))?;
                changed = true;
            }
        }

        Ok(match (changed, created) {
            (false, _) => ApplyResult::NoChange,
            (true, true) => ApplyResult::Created,
            (true, false) => ApplyResult::Modified,
        })
    }
}
