//! Swap file resource

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

use super::{ApplyContext, ApplyResult, FSTAB, Resource, ResourceState, read_optional};

const SWAP_FILE: &str = "/swap.img";
const FSTAB_LINE: &str = "/swap.img none swap sw 0 0";
const FSTAB_GUARD: &str = r"^/swap\.img\s+none\s+swap\s+sw\s+0\s+0$";

/// A swap file of `size_gb` gigabytes, enabled at boot; zero or less disables it
#[derive(Debug, Clone)]
pub struct Swap {
    pub size_gb: i64,
}

impl Swap {
    pub fn new(size_gb: i64) -> Self {
        Self { size_gb }
    }

    fn disabled(&self) -> bool {
        self.size_gb <= 0
    }

    fn guard() -> Result<Regex> {
        Regex::new(FSTAB_GUARD).context("Invalid fstab guard")
    }

    fn in_fstab(ctx: &ApplyContext) -> Result<bool> {
        let guard = Self::guard()?;
        Ok(read_optional(ctx, FSTAB)?
            .is_some_and(|fstab| fstab.lines().any(|l| guard.is_match(l.trim()))))
    }
}

impl Resource for Swap {
    fn id(&self) -> String {
        SWAP_FILE.to_string()
    }

    fn description(&self) -> String {
        if self.disabled() {
            "Swap (disabled)".to_string()
        } else {
            format!("Swap {}G at {SWAP_FILE}", self.size_gb)
        }
    }

    fn resource_type(&self) -> &'static str {
        "swap"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        if self.disabled() {
            return Ok(self.desired_state());
        }
        let file = ctx.probe.exists(Path::new(SWAP_FILE));
        let entry = Self::in_fstab(ctx)?;
        Ok(match (file, entry) {
            (true, true) => ResourceState::present(),
            (false, false) => ResourceState::Absent,
            (true, false) => ResourceState::Modified {
                from: "no fstab entry".into(),
                to: "enabled at boot".into(),
            },
            (false, true) => ResourceState::Modified {
                from: "fstab entry without file".into(),
                to: format!("{}G file", self.size_gb),
            },
        })
    }

    fn desired_state(&self) -> ResourceState {
        if self.disabled() {
            ResourceState::present_with("disabled")
        } else {
            ResourceState::present()
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if self.disabled() {
            return Ok(ApplyResult::Skipped {
                reason: "swap disabled".into(),
            });
        }

        let mut created = false;
        if !ctx.probe.exists(Path::new(SWAP_FILE)) {
            ctx.run_all(&[
                format!("fallocate -l {}G {SWAP_FILE}", self.size_gb),
                format!("chmod 600 {SWAP_FILE}"),
                format!("mkswap {SWAP_FILE}"),
                format!("swapon {SWAP_FILE}"),
            ])?;
            created = true;
        } else {
            log::debug!("{SWAP_FILE} exists");
        }

        let appended = ctx.append_line(Path::new(FSTAB), &Self::guard()?, FSTAB_LINE)?;

        Ok(match (created, appended) {
            (true, _) => ApplyResult::Created,
            (false, true) => ApplyResult::Modified,
            (false, false) => ApplyResult::NoChange,
        })
    }
}
