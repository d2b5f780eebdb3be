//! Final step: certificate issuance and numeric id discovery
//!
//! The ids end up in two places. They are published next to the certificates
//! for the deployment side, and they are handed back to the engine through
//! [`CollectData::discovered`] so the desired-state record can be updated.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use super::{ApplyContext, ApplyResult, Resource, ResourceState, read_optional};
use crate::config::SystemIds;
use crate::error::ProvisionError;
use crate::paths::{DOCKER_GROUP, IDS_PATH, TOOLS_USER, certificate_path};

#[derive(Debug, Clone)]
pub struct CollectData {
    pub host_name: String,
    pub sys_admin: String,
    /// Ids already in the record
    pub known: SystemIds,
    discovered: Arc<OnceLock<SystemIds>>,
}

impl CollectData {
    pub fn new(host_name: &str, sys_admin: &str, known: SystemIds) -> Self {
        Self {
            host_name: host_name.to_string(),
            sys_admin: sys_admin.to_string(),
            known,
            discovered: Arc::new(OnceLock::new()),
        }
    }

    /// Handle to the ids found during apply
    pub fn discovered(&self) -> Arc<OnceLock<SystemIds>> {
        Arc::clone(&self.discovered)
    }

    fn certbot_command(&self) -> String {
        let contact = if self.sys_admin.trim().is_empty() {
            "--register-unsafely-without-email".to_string()
        } else {
            format!("-m {}", self.sys_admin.trim())
        };
        format!(
            "certbot certonly --standalone --non-interactive --agree-tos {contact} -d {}",
            self.host_name
        )
    }

    /// Look up the ids; `None` when the account or group does not exist yet
    fn lookup(ctx: &ApplyContext) -> Result<Option<SystemIds>> {
        let Some(account) = ctx.probe.account(TOOLS_USER)? else {
            return Ok(None);
        };
        let Some(docker_gid) = ctx.probe.group_id(DOCKER_GROUP)? else {
            return Ok(None);
        };
        Ok(Some(SystemIds {
            tools_uid: account.uid,
            tools_gid: account.gid,
            docker_gid,
        }))
    }

    fn ids_document(ids: &SystemIds) -> Result<String> {
        let mut doc = serde_json::to_string_pretty(ids).context("Failed to encode ids")?;
        doc.push('\n');
        Ok(doc)
    }
}

impl Resource for CollectData {
    fn id(&self) -> String {
        "collect".to_string()
    }

    fn description(&self) -> String {
        format!("Certificate and ids for {}", self.host_name)
    }

    fn resource_type(&self) -> &'static str {
        "collect"
    }

    fn current_state(&self, ctx: &ApplyContext) -> Result<ResourceState> {
        if !ctx.probe.exists(&certificate_path(&self.host_name)) {
            return Ok(ResourceState::Absent);
        }
        let Some(ids) = Self::lookup(ctx)? else {
            return Ok(ResourceState::Absent);
        };
        let published = read_optional(ctx, IDS_PATH)?;
        if ids == self.known && published.as_deref() == Some(Self::ids_document(&ids)?.as_str()) {
            Ok(ResourceState::present())
        } else {
            Ok(ResourceState::Modified {
                from: format!(
                    "uid {} gid {} docker {}",
                    self.known.tools_uid, self.known.tools_gid, self.known.docker_gid
                ),
                to: format!(
                    "uid {} gid {} docker {}",
                    ids.tools_uid, ids.tools_gid, ids.docker_gid
                ),
            })
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let mut changed = false;

        if !ctx.probe.exists(&certificate_path(&self.host_name)) {
            ctx.run(&self.certbot_command())?;
            changed = true;
        }

        let ids = match Self::lookup(ctx)? {
            Some(ids) => ids,
            // The account step only pretended to create it
            None if ctx.preview => {
                log::info!("preview: {TOOLS_USER} ids not available yet");
                return Ok(if changed {
                    ApplyResult::Modified
                } else {
                    ApplyResult::NoChange
                });
            }
            None => {
                if ctx.probe.account(TOOLS_USER)?.is_none() {
                    return Err(ProvisionError::AccountMissing(TOOLS_USER.into()).into());
                }
                return Err(ProvisionError::GroupMissing(DOCKER_GROUP.into()).into());
            }
        };

        let document = Self::ids_document(&ids)?;
        if read_optional(ctx, IDS_PATH)?.as_deref() != Some(document.as_str()) {
            ctx.write_file(Path::new(IDS_PATH), document.as_bytes(), 0o644)?;
            changed = true;
        }

        if ids != self.known {
            log::info!(
                "discovered ids: uid {} gid {} docker {}",
                ids.tools_uid,
                ids.tools_gid,
                ids.docker_gid
            );
            changed = true;
        }
        let recorded = *self.discovered.get_or_init(|| ids);
        if recorded != ids {
            log::warn!(
                "ids changed within one run: keeping uid {} gid {} docker {}, ignoring uid {} gid {} docker {}",
                recorded.tools_uid,
                recorded.tools_gid,
                recorded.docker_gid,
                ids.tools_uid,
                ids.tools_gid,
                ids.docker_gid
            );
        }

        Ok(if changed {
            ApplyResult::Modified
        } else {
            ApplyResult::NoChange
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostkit::CommandRunner;
    use hostkit::mock::MockHost;

    fn host_with_account() -> MockHost {
        let host = MockHost::new();
        host.run("useradd -r -m -s /bin/bash gd-tools", false).unwrap();
        host.clear_records();
        host
    }

    #[test]
    fn test_issues_certificate_and_publishes_ids() {
        let host = host_with_account();
        let mut ctx = ApplyContext::new(&host, &host);
        let step = CollectData::new("gd.example.com", "admin@example.com", SystemIds::default());

        assert_eq!(step.apply(&mut ctx).unwrap(), ApplyResult::Modified);
        assert_eq!(
            host.executed(),
            vec![
                "certbot certonly --standalone --non-interactive --agree-tos -m admin@example.com -d gd.example.com"
            ]
        );
        let ids = *step.discovered().get().unwrap();
        assert_eq!(
            ids,
            SystemIds {
                tools_uid: 998,
                tools_gid: 998,
                docker_gid: 999
            }
        );
        let published: SystemIds = serde_json::from_str(&host.file(IDS_PATH).unwrap()).unwrap();
        assert_eq!(published, ids);
    }

    #[test]
    fn test_converged_when_ids_known() {
        let host = host_with_account()
            .with_file("/etc/letsencrypt/live/gd.example.com/fullchain.pem", "cert");
        let ids = SystemIds {
            tools_uid: 998,
            tools_gid: 998,
            docker_gid: 999,
        };
        let host = host.with_file(IDS_PATH, &CollectData::ids_document(&ids).unwrap());
        let mut ctx = ApplyContext::new(&host, &host);
        let step = CollectData::new("gd.example.com", "admin@example.com", ids);

        assert_eq!(step.current_state(&ctx).unwrap(), ResourceState::present());
        assert_eq!(step.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
        assert!(host.executed().is_empty());
        assert!(host.writes().is_empty());
    }

    #[test]
    fn test_first_discovery_wins() {
        let host = host_with_account();
        let mut ctx = ApplyContext::new(&host, &host);
        let step = CollectData::new("gd.example.com", "admin@example.com", SystemIds::default());
        let earlier = SystemIds {
            tools_uid: 1001,
            tools_gid: 1001,
            docker_gid: 999,
        };
        step.discovered().set(earlier).unwrap();

        assert_eq!(step.apply(&mut ctx).unwrap(), ApplyResult::Modified);
        assert_eq!(step.discovered().get(), Some(&earlier));
    }

    #[test]
    fn test_preview_without_account() {
        let host = MockHost::new();
        let mut ctx = ApplyContext::new(&host, &host).with_preview(true);
        let step = CollectData::new("gd.example.com", "", SystemIds::default());

        assert_eq!(step.apply(&mut ctx).unwrap(), ApplyResult::Modified);
        assert_eq!(
            host.previewed(),
            vec![
                "certbot certonly --standalone --non-interactive --agree-tos --register-unsafely-without-email -d gd.example.com"
            ]
        );
        assert!(step.discovered().get().is_none());
    }

    #[test]
    fn test_missing_account_is_fatal() {
        let host = MockHost::new()
            .with_file("/etc/letsencrypt/live/gd.example.com/fullchain.pem", "cert");
        let mut ctx = ApplyContext::new(&host, &host);
        let step = CollectData::new("gd.example.com", "admin@example.com", SystemIds::default());
        let err = step.apply(&mut ctx).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::AccountMissing(_))
        ));
    }
}
