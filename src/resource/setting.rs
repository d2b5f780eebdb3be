//! Single-value host settings: time zone and host name

use anyhow::{Context, Result};
use std::path::Path;

use super::{ApplyContext, ApplyResult, Resource, ResourceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    TimeZone,
    HostName,
}

impl SettingKind {
    fn id(self) -> &'static str {
        match self {
            Self::TimeZone => "time_zone",
            Self::HostName => "host_name",
        }
    }

    /// File holding the live value
    fn source(self) -> &'static str {
        match self {
            Self::TimeZone => "/etc/timezone",
            Self::HostName => "/etc/hostname",
        }
    }

    fn command(self, value: &str) -> String {
        match self {
            Self::TimeZone => format!("timedatectl set-timezone {value}"),
            Self::HostName => format!("hostnamectl set-hostname {value}"),
        }
    }
}

/// A host setting read from a one-line file and changed by a *ctl tool
#[derive(Debug, Clone)]
pub struct HostSetting {
    pub kind: SettingKind,
    pub value: String,
}

impl HostSetting {
    pub fn time_zone(zone: &str) -> Self {
        Self {
            kind: SettingKind::TimeZone,
            value: zone.to_string(),
        }
    }

    pub fn host_name(name: &str) -> Self {
        Self {
            kind: SettingKind::HostName,
            value: name.to_string(),
        }
    }
}

impl Resource for HostSetting {
    fn id(&self) -> String {
        self.kind.id().to_string()
    }

    fn description(&self) -> String {
        match self.kind {
            SettingKind::TimeZone => format!("Time zone {}", self.value),
            SettingKind::HostName => format!("Host name {}", self.value),
        }
    }

    fn resource_type(&self) -> &'static str {
        self.kind.id()
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        let path = Path::new(self.kind.source());
        let value = ctx
            .probe
            .read_line(path)
            .with_context(|| format!("Could not read the current {}", self.kind.id()))?;
        Ok(ResourceState::present_with(value))
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present_with(self.value.clone())
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if self.current_state(ctx)? == self.desired_state() {
            log::debug!("{} already {}", self.kind.id(), self.value);
            return Ok(ApplyResult::NoChange);
        }
        ctx.run(&self.kind.command(&self.value))?;
        Ok(ApplyResult::Modified)
    }
}
