use std::path::PathBuf;

use thiserror::Error;

/// A malformed piece of the workflow configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid image reference `{value}`: {reason}")]
    InvalidImageRef { value: String, reason: String },

    #[error("image reference `{0}` has no tag (expected name:tag)")]
    MissingTag(String),

    #[error("invalid container name `{0}` (allowed: [a-zA-Z0-9][a-zA-Z0-9_.-]*)")]
    InvalidContainerName(String),

    #[error("invalid port mapping `{value}`: {reason}")]
    InvalidPortMapping { value: String, reason: String },

    #[error("host port {0} is published more than once")]
    DuplicateHostPort(u16),

    #[error("invalid volume `{value}`: {reason}")]
    InvalidVolume { value: String, reason: String },

    #[error("mount source not found: {0}")]
    MountSourceMissing(PathBuf),

    #[error("mount source is not a directory: {0}")]
    MountSourceNotDir(PathBuf),

    #[error("build context not found: {0}")]
    ContextMissing(PathBuf),

    #[error("build file not found: {0}")]
    BuildFileMissing(PathBuf),

    #[error("shell must not be empty")]
    EmptyShell,

    #[error("invalid install command `{value}`: {reason}")]
    InvalidInstallCommand { value: String, reason: String },

    #[error("install workdir `{0}` must be an absolute container path")]
    RelativeInstallWorkdir(String),
}
