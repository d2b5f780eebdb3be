//! Elevation check
//!
//! Provisioning writes to /etc, creates accounts and mounts volumes, so the
//! whole run needs root. The check happens once, before any step.

use crate::error::ProvisionError;

/// Effective uid of this process
pub fn effective_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() }
}

/// Fail unless `euid` is root
pub fn require_root(euid: u32) -> Result<(), ProvisionError> {
    if euid == 0 {
        Ok(())
    } else {
        log::debug!("effective uid {euid} is not root");
        Err(ProvisionError::NotRoot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_root() {
        assert!(require_root(0).is_ok());
        assert!(matches!(require_root(1000), Err(ProvisionError::NotRoot)));
    }
}
