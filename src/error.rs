//! Named failure conditions of a provisioning run

use thiserror::Error;

/// Broad class of a failure, matching how an operator should react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A required file or device is missing or unreadable
    Probe,
    /// An external command exited non-zero
    Command,
    /// The desired state names something this tool cannot handle
    UnsupportedInput,
    /// Wrong execution context or missing elevation
    Privilege,
}

impl ErrorCategory {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Probe => "host probe failed",
            Self::Command => "command failed",
            Self::UnsupportedInput => "unsupported configuration",
            Self::Privilege => "insufficient privilege",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("volume not found: {0}")]
    VolumeNotFound(String),

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("invalid {provider} identifier: {identifier:?}")]
    InvalidIdentifier { provider: String, identifier: String },

    #[error("{field} must not contain whitespace: {value:?}")]
    UnsafeValue { field: String, value: String },

    #[error("mountpoint must be absolute: {0}")]
    RelativeMountpoint(String),

    #[error("mountpoint declared more than once: {0}")]
    DuplicateMountpoint(String),

    #[error("account {0} is missing after creation")]
    AccountMissing(String),

    #[error("group {0} does not exist")]
    GroupMissing(String),

    #[error("must be run as root")]
    NotRoot,

    #[error("unsupported architecture: {0}")]
    UnsupportedArch(String),

    #[error("VERSION_CODENAME missing from {0}")]
    MissingCodename(String),
}

impl ProvisionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::VolumeNotFound(_)
            | Self::AccountMissing(_)
            | Self::GroupMissing(_)
            | Self::MissingCodename(_) => ErrorCategory::Probe,
            Self::UnsupportedProvider(_)
            | Self::InvalidIdentifier { .. }
            | Self::UnsafeValue { .. }
            | Self::RelativeMountpoint(_)
            | Self::DuplicateMountpoint(_)
            | Self::UnsupportedArch(_) => ErrorCategory::UnsupportedInput,
            Self::NotRoot => ErrorCategory::Privilege,
        }
    }
}

/// Category of any error in a run, looking through anyhow context layers
pub fn categorize(err: &anyhow::Error) -> ErrorCategory {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ProvisionError>() {
            return e.category();
        }
        if let Some(e) = cause.downcast_ref::<hostkit::Error>() {
            return match e.category() {
                hostkit::ErrorCategory::Probe => ErrorCategory::Probe,
                hostkit::ErrorCategory::Command => ErrorCategory::Command,
                hostkit::ErrorCategory::Input => ErrorCategory::UnsupportedInput,
            };
        }
    }
    ErrorCategory::Probe
}
