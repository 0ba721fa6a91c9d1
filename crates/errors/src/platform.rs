//! Platform capability errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors that can occur while resolving or using platform capabilities
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PlatformError {
    #[error("unsupported platform: {os}")]
    UnsupportedPlatform { os: String },

    #[error("no {capability} capability on {platform}")]
    UnsupportedCapability { capability: String, platform: String },

    #[error("process execution failed: {command} - {message}")]
    ProcessExecutionFailed { command: String, message: String },

    #[error("filesystem operation failed: {operation} - {message}")]
    FilesystemOperationFailed { operation: String, message: String },

    #[error("unrecognised version string: {raw}")]
    InvalidVersion { raw: String },
}

impl PlatformError {
    /// Shorthand for a missing capability on a named platform.
    pub fn unsupported_capability(capability: impl Into<String>, platform: impl Into<String>) -> Self {
        Self::UnsupportedCapability {
            capability: capability.into(),
            platform: platform.into(),
        }
    }
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedPlatform { .. } => Some("keg only runs on macOS and Linux hosts."),
            Self::UnsupportedCapability { .. } => {
                Some("This operation needs a system tool the current platform does not provide.")
            }
            Self::ProcessExecutionFailed { .. } => {
                Some("Check that the tool is installed and on the expected path.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::UnsupportedPlatform { .. } => "platform.unsupported_platform",
            Self::UnsupportedCapability { .. } => "platform.unsupported_capability",
            Self::ProcessExecutionFailed { .. } => "platform.process_failed",
            Self::FilesystemOperationFailed { .. } => "platform.filesystem_failed",
            Self::InvalidVersion { .. } => "platform.invalid_version",
        })
    }
}
