//! Docker apt repository resource
//!
//! Installs Docker's signing key and source list so that `docker-ce` and
//! friends can be installed by the package step.

use anyhow::Result;
use std::path::Path;

use super::{ApplyContext, ApplyResult, Resource, ResourceState, change_result, read_optional};
use crate::error::ProvisionError;

const DOCKER_URL: &str = "https://download.docker.com/linux/ubuntu";
const KEYRING_DIR: &str = "/etc/apt/keyrings";
const KEY_PATH: &str = "/etc/apt/keyrings/docker.asc";
const LIST_PATH: &str = "/etc/apt/sources.list.d/docker.list";
const OS_RELEASE: &str = "/etc/os-release";

/// Map a Rust target architecture to the Debian one
pub fn apt_arch(arch: &str) -> Result<&'static str, ProvisionError> {
    match arch {
        "x86_64" => Ok("amd64"),
        "aarch64" => Ok("arm64"),
        other => Err(ProvisionError::UnsupportedArch(other.to_string())),
    }
}

/// Value of `VERSION_CODENAME` in os-release(5) content
pub fn codename(os_release: &str) -> Option<String> {
    os_release.lines().find_map(|line| {
        line.trim()
            .strip_prefix("VERSION_CODENAME=")
            .map(|v| v.trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
    })
}

#[derive(Debug, Clone)]
pub struct DockerRepo {
    /// Rust name of the host architecture
    pub arch: String,
}

impl Default for DockerRepo {
    fn default() -> Self {
        Self {
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

impl DockerRepo {
    /// The exact source list this host should carry
    fn source_list(&self, ctx: &ApplyContext) -> Result<String> {
        let arch = apt_arch(&self.arch)?;
        let os_release = ctx.probe.read_to_string(Path::new(OS_RELEASE))?;
        let codename =
            codename(&os_release).ok_or_else(|| ProvisionError::MissingCodename(OS_RELEASE.into()))?;
        Ok(format!(
            "deb [arch={arch} signed-by={KEY_PATH}] {DOCKER_URL} {codename} stable\n"
        ))
    }
}

impl Resource for DockerRepo {
    fn id(&self) -> String {
        "docker".to_string()
    }

    fn description(&self) -> String {
        "Docker apt repository".to_string()
    }

    fn resource_type(&self) -> &'static str {
        "docker_repo"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        let expected = self.source_list(ctx)?;
        let key = ctx.probe.exists(Path::new(KEY_PATH));
        Ok(match read_optional(ctx, LIST_PATH)? {
            Some(list) if key && list == expected => ResourceState::present(),
            Some(list) => ResourceState::Modified {
                from: list.trim().to_string(),
                to: expected.trim().to_string(),
            },
            None => ResourceState::Absent,
        })
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let expected = self.source_list(ctx)?;
        let list = read_optional(ctx, LIST_PATH)?;
        let has_key = ctx.probe.exists(Path::new(KEY_PATH));

        if has_key && list.as_deref() == Some(expected.as_str()) {
            return Ok(ApplyResult::NoChange);
        }

        if !has_key {
            ctx.run(&format!("install -m 0755 -d {KEYRING_DIR}"))?;
            let key = if ctx.preview {
                Vec::new()
            } else {
                ctx.probe.fetch(&format!("{DOCKER_URL}/gpg"))?
            };
            ctx.write_file(Path::new(KEY_PATH), &key, 0o644)?;
        }

        if list.as_deref() != Some(expected.as_str()) {
            ctx.write_file(Path::new(LIST_PATH), expected.as_bytes(), 0o644)?;
        }

        Ok(change_result(list.is_none()))
    }
}
