//! Command implementations

pub mod diff;
pub mod system;

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use crate::config::DesiredState;
use crate::paths;

/// Load the record named by `--config`, the environment, or the default path
pub fn load_state(flag: Option<&Path>) -> Result<(PathBuf, DesiredState)> {
    let path = paths::config_path(flag);
    let state = DesiredState::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    Ok((path, state))
}
