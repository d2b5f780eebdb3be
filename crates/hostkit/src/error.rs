//! Error types for host commands and probes.
//!
//! Errors are categorized so callers can tell a failed probe (something
//! missing or unreadable on the host) from a failed command (a process that
//! exited non-zero or could not be started).

use std::path::PathBuf;
use thiserror::Error;

/// Categories of host errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A required file, device or account is missing or unreadable
    Probe,
    /// An external command failed or could not be started
    Command,
    /// The caller passed something that cannot be executed or parsed
    Input,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Probe => "Host state could not be read",
            Self::Command => "External command failed",
            Self::Input => "Invalid input",
        }
    }
}

/// Errors that can occur while running commands or probing the host.
#[derive(Debug, Error)]
pub enum Error {
    /// Command line was empty after trimming
    #[error("empty command line")]
    EmptyCommand,

    /// The process could not be spawned
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        /// The command line that was attempted
        command: String,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// The process ran but exited unsuccessfully
    #[error("`{command}` failed ({status})")]
    CommandFailed {
        /// The command line that failed
        command: String,
        /// Exit status as reported by the OS
        status: String,
        /// Captured standard error, if any was captured
        stderr: String,
    },

    /// A file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// Path that was read
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// A file could not be written
    #[error("cannot write {}: {source}", path.display())]
    Write {
        /// Path that was written
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// A line in a system database (passwd, group) could not be parsed
    #[error("malformed entry in {}: {line}", path.display())]
    Malformed {
        /// File containing the entry
        path: PathBuf,
        /// Offending line
        line: String,
    },

    /// A download failed
    #[error("fetching {url} failed: {message}")]
    Fetch {
        /// Requested URL
        url: String,
        /// Transport or status error
        message: String,
    },

    /// Invalid regular expression
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Spawn { .. } | Self::CommandFailed { .. } => ErrorCategory::Command,
            Self::Read { .. } | Self::Malformed { .. } | Self::Fetch { .. } => ErrorCategory::Probe,
            Self::EmptyCommand | Self::Write { .. } | Self::Pattern(_) => ErrorCategory::Input,
        }
    }

    /// Whether the error means a file was simply not there.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Result type for host operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_errors_are_command_category() {
        let err = Error::CommandFailed {
            command: "apt-get install -y git".to_string(),
            status: "exit status: 100".to_string(),
            stderr: String::new(),
        };
        assert_eq!(err.category(), ErrorCategory::Command);
        assert_eq!(err.to_string(), "`apt-get install -y git` failed (exit status: 100)");
    }

    #[test]
    fn test_missing_file_is_probe_error() {
        let err = Error::Read {
            path: PathBuf::from("/etc/timezone"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.category(), ErrorCategory::Probe);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_empty_command_is_input_error() {
        assert_eq!(Error::EmptyCommand.category(), ErrorCategory::Input);
        assert!(!Error::EmptyCommand.is_not_found());
    }
}
