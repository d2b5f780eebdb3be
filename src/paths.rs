//! Well-known host paths and the execution context
//!
//! # Environment Variables
//!
//! - `GD_TOOLS_CONFIG` - Override the desired-state file path
//! - `GD_TOOLS_ENV` - Override the execution context (`prod` or `dev`)
//!
//! # Execution Context
//!
//! A managed host carries `/etc/gd-tools-env` with the word `prod`. A
//! development machine says `dev`. A missing or unreadable marker means the
//! host has not been provisioned yet and is treated as a target.

use std::path::{Path, PathBuf};

use hostkit::StateProbe;

/// Environment variable for the desired-state file override
pub const ENV_CONFIG: &str = "GD_TOOLS_CONFIG";

/// Environment variable for the execution context override
pub const ENV_CONTEXT: &str = "GD_TOOLS_ENV";

/// Default location of the desired-state record
pub const CONFIG_PATH: &str = "/etc/gd-tools-config.json";

/// Marker holding the execution context label
pub const ENV_MARKER: &str = "/etc/gd-tools-env";

/// Name of the service account and of its data root
pub const TOOLS_USER: &str = "gd-tools";

/// Group granting access to the container runtime
pub const DOCKER_GROUP: &str = "docker";

/// Data root owned by the service account
pub const DATA_ROOT: &str = "/var/gd-tools";

/// Where the numeric ids are published next to the certificates
pub const IDS_PATH: &str = "/etc/letsencrypt/gd-tools-ids.json";

/// Where the host is running this tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecContext {
    /// A managed host
    Prod,
    /// A developer machine: never provision
    Dev,
    /// No marker yet, i.e. a host before its first run
    Unknown,
}

impl ExecContext {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "prod" => Self::Prod,
            "dev" => Self::Dev,
            _ => Self::Unknown,
        }
    }

    pub fn is_dev(self) -> bool {
        self == Self::Dev
    }
}

/// Resolve the desired-state path
///
/// Priority:
/// 1. `--config` flag
/// 2. `GD_TOOLS_CONFIG` env var
/// 3. `/etc/gd-tools-config.json`
pub fn config_path(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(ENV_CONFIG) {
        log::debug!("Using config from {ENV_CONFIG}: {path}");
        return PathBuf::from(path);
    }
    PathBuf::from(CONFIG_PATH)
}

/// Detect the execution context from the env override or the marker file
pub fn exec_context(probe: &dyn StateProbe) -> ExecContext {
    if let Ok(label) = std::env::var(ENV_CONTEXT) {
        log::debug!("Using context from {ENV_CONTEXT}: {label}");
        return ExecContext::from_label(&label);
    }
    match probe.read_line(Path::new(ENV_MARKER)) {
        Ok(label) => ExecContext::from_label(&label),
        Err(e) => {
            log::debug!("no context marker: {e}");
            ExecContext::Unknown
        }
    }
}

/// Home of the administrator whose SSH keys the service account inherits
pub fn admin_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"))
}

/// Certificate the certificate step checks for
pub fn certificate_path(host_name: &str) -> PathBuf {
    Path::new("/etc/letsencrypt/live")
        .join(host_name)
        .join("fullchain.pem")
}
