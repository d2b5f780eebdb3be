//! The desired-state record for one host
//!
//! Persisted as pretty JSON. Runtime flags (`preview`, `progress`, `upgrade`,
//! `current_path`) ride along in the same value but are never written.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ProvisionError;

/// Storage backend of a mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountProvider {
    /// Hetzner cloud volume, attached at `/mnt/HC_Volume_<id>` by default
    Hetzner,
    /// Local block device
    Raid,
}

impl std::str::FromStr for MountProvider {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hetzner" => Ok(Self::Hetzner),
            "raid" => Ok(Self::Raid),
            _ => Err(ProvisionError::UnsupportedProvider(s.to_string())),
        }
    }
}

impl std::fmt::Display for MountProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hetzner => write!(f, "hetzner"),
            Self::Raid => write!(f, "raid"),
        }
    }
}

/// One declared volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Kept as written; parsed at the dispatch point so an unknown tag is an
    /// error of the run, not of loading the file
    pub provider: String,
    /// Volume id (Hetzner) or block device (RAID)
    pub identifier: String,
    pub mountpoint: String,
}

impl Mount {
    #[cfg(test)]
    pub fn new(provider: MountProvider, identifier: &str, mountpoint: &str) -> Self {
        Self {
            provider: provider.to_string(),
            identifier: identifier.to_string(),
            mountpoint: mountpoint.to_string(),
        }
    }

    pub fn provider(&self) -> Result<MountProvider, ProvisionError> {
        self.provider.parse()
    }
}

fn check_token(field: &str, value: &str) -> Result<(), ProvisionError> {
    if value.contains(char::is_whitespace) {
        return Err(ProvisionError::UnsafeValue {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Numeric ids discovered on the host after the account exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemIds {
    pub tools_uid: u32,
    pub tools_gid: u32,
    pub docker_gid: u32,
}

fn default_ssh_service() -> String {
    "OpenSSH".to_string()
}

/// Desired state of the managed host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub version: String,
    pub time_zone: String,
    pub host_name: String,
    #[serde(default)]
    pub domain_name: String,
    /// Whole gigabytes, zero or less disables swap
    #[serde(default)]
    pub swap_space: i64,
    /// ufw application profile, not a port number
    #[serde(rename = "ssh_port", default = "default_ssh_service")]
    pub ssh_service: String,
    #[serde(default)]
    pub sys_admin: String,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub mounts: Vec<Mount>,

    #[serde(default)]
    pub tools_uid: u32,
    #[serde(default)]
    pub tools_gid: u32,
    #[serde(default)]
    pub docker_gid: u32,

    #[serde(skip)]
    pub preview: bool,
    #[serde(skip)]
    pub progress: bool,
    #[serde(skip)]
    pub upgrade: bool,
    #[serde(skip)]
    pub current_path: PathBuf,
}

impl DesiredState {
    /// Load the record, capturing the working directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid desired state in {}", path.display()))?;
        state.current_path = std::env::current_dir().unwrap_or_default();
        log::debug!("loaded desired state for {} from {}", state.host_name, path.display());
        Ok(state)
    }

    /// Save the persisted fields as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))?;
        log::info!("saved desired state to {}", path.display());
        Ok(())
    }

    /// Reject records the engine cannot act on unambiguously
    ///
    /// Values end up as single arguments of whitespace-split command lines
    /// and as fstab fields, so none of them may contain whitespace.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        check_token("time_zone", &self.time_zone)?;
        check_token("host_name", &self.host_name)?;
        check_token("ssh_port", &self.ssh_service)?;
        check_token("sys_admin", self.sys_admin.trim())?;
        for package in &self.packages {
            check_token("packages", package)?;
        }

        let mut seen = HashSet::new();
        for mount in &self.mounts {
            mount.provider()?;
            check_token("mounts.identifier", &mount.identifier)?;
            check_token("mounts.mountpoint", &mount.mountpoint)?;
            if !mount.mountpoint.starts_with('/') {
                return Err(ProvisionError::RelativeMountpoint(mount.mountpoint.clone()));
            }
            if !seen.insert(mount.mountpoint.trim_end_matches('/')) {
                return Err(ProvisionError::DuplicateMountpoint(mount.mountpoint.clone()));
            }
        }
        Ok(())
    }

    pub fn ids(&self) -> SystemIds {
        SystemIds {
            tools_uid: self.tools_uid,
            tools_gid: self.tools_gid,
            docker_gid: self.docker_gid,
        }
    }

    /// Copy with discovered ids applied
    pub fn with_ids(&self, ids: SystemIds) -> Self {
        Self {
            tools_uid: ids.tools_uid,
            tools_gid: ids.tools_gid,
            docker_gid: ids.docker_gid,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "version": "v1.0.0",
        "time_zone": "Europe/Berlin",
        "host_name": "gd.example.com",
        "domain_name": "example.com",
        "swap_space": 4,
        "ssh_port": "OpenSSH",
        "sys_admin": "admin@example.com",
        "packages": ["git", "docker-ce"],
        "mounts": [
            {"provider": "raid", "identifier": "/dev/sdb1", "mountpoint": "/var/gd-tools"}
        ]
    }"#;

    #[test]
    fn test_parse_record() {
        let state: DesiredState = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(state.swap_space, 4);
        assert_eq!(state.ssh_service, "OpenSSH");
        assert_eq!(state.mounts[0].provider().unwrap(), MountProvider::Raid);
        assert_eq!(state.docker_gid, 0);
        assert!(!state.preview);
    }

    #[test]
    fn test_negative_swap_loads() {
        let state: DesiredState = serde_json::from_str(
            r#"{"time_zone": "UTC", "host_name": "h", "swap_space": -1}"#,
        )
        .unwrap();
        assert_eq!(state.swap_space, -1);
    }

    #[test]
    fn test_ssh_service_defaults() {
        let state: DesiredState =
            serde_json::from_str(r#"{"time_zone": "UTC", "host_name": "h"}"#).unwrap();
        assert_eq!(state.ssh_service, "OpenSSH");
        assert!(state.mounts.is_empty());
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("Hetzner".parse::<MountProvider>().unwrap(), MountProvider::Hetzner);
        assert_eq!("RAID".parse::<MountProvider>().unwrap(), MountProvider::Raid);
        let err = "nfs".parse::<MountProvider>().unwrap_err();
        assert!(matches!(err, ProvisionError::UnsupportedProvider(ref p) if p == "nfs"));
    }

    #[test]
    fn test_runtime_flags_not_persisted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        let mut state: DesiredState = serde_json::from_str(SAMPLE).unwrap();
        state.preview = true;
        state.upgrade = true;
        state.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("preview"));
        assert!(!raw.contains("upgrade"));
        assert!(raw.contains("\"ssh_port\": \"OpenSSH\""));

        let loaded = DesiredState::load(&path).unwrap();
        assert!(!loaded.preview);
        assert_eq!(loaded.packages, state.packages);
    }

    #[test]
    fn test_duplicate_mountpoints_rejected() {
        let mut state: DesiredState = serde_json::from_str(SAMPLE).unwrap();
        state.validate().unwrap();
        state
            .mounts
            .push(Mount::new(MountProvider::Hetzner, "42", "/var/gd-tools/"));
        let err = state.validate().unwrap_err();
        assert!(matches!(err, ProvisionError::DuplicateMountpoint(_)));

        state.mounts = vec![Mount::new(MountProvider::Raid, "/dev/sdb1", "data")];
        assert!(matches!(
            state.validate(),
            Err(ProvisionError::RelativeMountpoint(_))
        ));
    }

    #[test]
    fn test_unknown_provider_rejected_up_front() {
        let mut state: DesiredState = serde_json::from_str(SAMPLE).unwrap();
        state.mounts.push(Mount {
            provider: "nfs".into(),
            identifier: "srv:/export".into(),
            mountpoint: "/srv/nfs".into(),
        });
        assert!(matches!(
            state.validate(),
            Err(ProvisionError::UnsupportedProvider(p)) if p == "nfs"
        ));
    }

    #[test]
    fn test_whitespace_in_values_rejected() {
        let base: DesiredState = serde_json::from_str(SAMPLE).unwrap();

        let mut state = base.clone();
        state.mounts = vec![Mount::new(MountProvider::Raid, "/dev/sdb1", "/var/gd tools")];
        assert!(matches!(
            state.validate(),
            Err(ProvisionError::UnsafeValue { field, .. }) if field == "mounts.mountpoint"
        ));

        let mut state = base.clone();
        state.host_name = "gd example.com".into();
        assert!(matches!(
            state.validate(),
            Err(ProvisionError::UnsafeValue { field, .. }) if field == "host_name"
        ));

        let mut state = base.clone();
        state.packages.push("docker-ce rsync".into());
        assert!(state.validate().is_err());

        let mut state = base;
        state.sys_admin = " admin@example.com\n".into();
        state.validate().unwrap();
    }

    #[test]
    fn test_with_ids_leaves_original() {
        let state: DesiredState = serde_json::from_str(SAMPLE).unwrap();
        let ids = SystemIds {
            tools_uid: 998,
            tools_gid: 998,
            docker_gid: 999,
        };
        let updated = state.with_ids(ids);
        assert_eq!(updated.ids(), ids);
        assert_eq!(state.tools_uid, 0);
        assert_eq!(updated.host_name, state.host_name);
    }
}
