//! Volume mount resource
//!
//! One handler per provider, selected in [`MountVolume::apply`]. A volume
//! counts as mounted when its mountpoint shows `lost+found`, which only a
//! mounted ext4 filesystem has.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

use super::{ApplyContext, ApplyResult, FSTAB, Resource, ResourceState};
use crate::config::{Mount, MountProvider};
use crate::error::ProvisionError;

const MARKER: &str = "lost+found";

/// Where Hetzner attaches a volume before it is moved
pub fn hetzner_legacy_path(volume_id: &str) -> String {
    format!("/mnt/HC_Volume_{volume_id}")
}

fn is_mounted(ctx: &ApplyContext, mountpoint: &str) -> bool {
    ctx.probe.exists(&Path::new(mountpoint).join(MARKER))
}

#[derive(Debug, Clone)]
pub struct MountVolume {
    pub mount: Mount,
}

impl MountVolume {
    pub fn new(mount: Mount) -> Self {
        Self { mount }
    }

    /// Move a volume from Hetzner's default path to the mountpoint
    fn migrate_hetzner(&self, ctx: &ApplyContext) -> Result<()> {
        let id = &self.mount.identifier;
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ProvisionError::InvalidIdentifier {
                provider: MountProvider::Hetzner.to_string(),
                identifier: id.clone(),
            }
            .into());
        }

        let legacy = hetzner_legacy_path(id);
        if !is_mounted(ctx, &legacy) {
            return Err(ProvisionError::VolumeNotFound(legacy).into());
        }

        let target = &self.mount.mountpoint;
        ctx.run_all(&[
            format!("umount {legacy}"),
            format!("mkdir -p {target}"),
            format!("sed -i -e s#{legacy}#{target}# {FSTAB}"),
            "systemctl daemon-reload".to_string(),
            "mount -a".to_string(),
            format!("rmdir {legacy}"),
            format!("chmod 0755 {target}"),
        ])
    }

    /// Add a local device to fstab by UUID and mount it
    fn mount_raid(&self, ctx: &ApplyContext) -> Result<()> {
        let device = &self.mount.identifier;
        if device.is_empty() || device.contains(char::is_whitespace) {
            return Err(ProvisionError::InvalidIdentifier {
                provider: MountProvider::Raid.to_string(),
                identifier: device.clone(),
            }
            .into());
        }

        let target = &self.mount.mountpoint;
        ctx.run(&format!("mkdir -p {target}"))?;

        let uuid = ctx
            .runner
            .capture(&format!("blkid -s UUID -o value {device}"))
            .with_context(|| format!("Could not resolve the UUID of {device}"))?;
        if uuid.is_empty() {
            return Err(ProvisionError::VolumeNotFound(device.clone()).into());
        }

        let guard = Regex::new(&regex::escape(&format!("UUID={uuid}")))?;
        let line = format!("UUID={uuid} {target} ext4 defaults,nofail 0 0");
        ctx.append_line(Path::new(FSTAB), &guard, &line)?;

        ctx.run_all(&["systemctl daemon-reload", "mount -a"])
    }
}

impl Resource for MountVolume {
    fn id(&self) -> String {
        self.mount.mountpoint.clone()
    }

    fn description(&self) -> String {
        format!(
            "{} volume {} at {}",
            self.mount.provider, self.mount.identifier, self.mount.mountpoint
        )
    }

    fn resource_type(&self) -> &'static str {
        "mount"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        if is_mounted(ctx, &self.mount.mountpoint) {
            Ok(ResourceState::present())
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let provider = self.mount.provider()?;
        if is_mounted(ctx, &self.mount.mountpoint) {
            log::info!("{} already mounted", self.mount.mountpoint);
            return Ok(ApplyResult::NoChange);
        }

        match provider {
            MountProvider::Hetzner => self.migrate_hetzner(ctx)?,
            MountProvider::Raid => self.mount_raid(ctx)?,
        }
        Ok(ApplyResult::Created)
    }
}
