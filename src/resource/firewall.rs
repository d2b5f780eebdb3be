//! ufw resource: allow SSH, then enable the firewall

use anyhow::{Context, Result};
use regex::Regex;

use super::{ApplyContext, ApplyResult, Resource, ResourceState};

#[derive(Debug, Clone)]
pub struct Firewall {
    /// ufw application profile, e.g. `OpenSSH`
    pub ssh_service: String,
}

impl Firewall {
    pub fn new(ssh_service: &str) -> Self {
        Self {
            ssh_service: ssh_service.to_string(),
        }
    }

    /// `ufw show added` lists rules even while the firewall is inactive
    fn ssh_allowed(&self, ctx: &ApplyContext) -> Result<bool> {
        let pattern = Regex::new(&format!(
            "(?m)^ufw allow {}$",
            regex::escape(&self.ssh_service)
        ))
        .context("Invalid ssh service pattern")?;
        Ok(ctx.runner.matches("ufw show added", &pattern)?)
    }

    fn active(ctx: &ApplyContext) -> Result<bool> {
        let pattern = Regex::new("Status: active").context("Invalid status pattern")?;
        Ok(ctx.runner.matches("ufw status", &pattern)?)
    }
}

impl Resource for Firewall {
    fn id(&self) -> String {
        "ufw".to_string()
    }

    fn description(&self) -> String {
        format!("Firewall allowing {}", self.ssh_service)
    }

    fn resource_type(&self) -> &'static str {
        "firewall"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        let allowed = self.ssh_allowed(ctx)?;
        let active = Self::active(ctx)?;
        Ok(match (allowed, active) {
            (true, true) => ResourceState::present_with(self.ssh_service.clone()),
            (_, false) => ResourceState::Absent,
            (false, true) => ResourceState::Modified {
                from: "active without ssh rule".into(),
                to: format!("allow {}", self.ssh_service),
            },
        })
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present_with(self.ssh_service.clone())
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let mut changed = false;

        // The rule goes first so enabling never locks out the session
        if !self.ssh_allowed(ctx)? {
            ctx.run(&format!("ufw allow {}", self.ssh_service))?;
            changed = true;
        }

        let was_active = Self::active(ctx)?;
        if !was_active {
            ctx.run("ufw --force enable")?;
            changed = true;
        }

        Ok(match (changed, was_active) {
            (false, _) => ApplyResult::NoChange,
            (true, false) => ApplyResult::Created,
            (true, true) => ApplyResult::Modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostkit::mock::MockHost;

    #[test]
    fn test_enable_inactive_firewall() {
        let host = MockHost::new().with_firewall(false, &[]);
        let mut ctx = ApplyContext::new(&host, &host);
        let step = Firewall::new("OpenSSH");

        assert_eq!(step.apply(&mut ctx).unwrap(), ApplyResult::Created);
        assert_eq!(host.executed(), vec!["ufw allow OpenSSH", "ufw --force enable"]);

        host.clear_records();
        assert_eq!(step.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
        assert!(host.executed().is_empty());
    }

    #[test]
    fn test_rule_added_to_active_firewall() {
        let host = MockHost::new().with_firewall(true, &["80/tcp"]);
        let mut ctx = ApplyContext::new(&host, &host);
        let step = Firewall::new("OpenSSH");
        assert!(matches!(
            step.current_state(&ctx).unwrap(),
            ResourceState::Modified { .. }
        ));
        assert_eq!(step.apply(&mut ctx).unwrap(), ApplyResult::Modified);
        assert_eq!(host.executed(), vec!["ufw allow OpenSSH"]);
    }

    #[test]
    fn test_similar_rule_does_not_count() {
        let host = MockHost::new().with_firewall(true, &["OpenSSH-alt"]);
        let ctx = ApplyContext::new(&host, &host);
        assert!(!Firewall::new("OpenSSH").ssh_allowed(&ctx).unwrap());
    }
}
