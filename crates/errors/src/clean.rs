//! Cleaner error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum CleanError {
    #[error("failed to classify {path}: {message}")]
    ClassificationError { path: String, message: String },

    #[error("failed to strip {path}: {message}")]
    StripError { path: String, message: String },

    #[error("filesystem error during {operation} on {path}: {message}")]
    FilesystemError {
        operation: String,
        path: String,
        message: String,
    },

    #[error("walk of {root} failed: {message}")]
    WalkFailed { root: String, message: String },
}

impl UserFacingError for CleanError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ClassificationError { .. } => Some(
                "Install the `file` utility, or set cleaner.skip_unclassifiable to skip such files.",
            ),
            Self::StripError { .. } => Some(
                "The binary may be partially written; rebuild the package before cleaning again.",
            ),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::ClassificationError { .. } => "clean.classification_failed",
            Self::StripError { .. } => "clean.strip_failed",
            Self::FilesystemError { .. } => "clean.filesystem_failed",
            Self::WalkFailed { .. } => "clean.walk_failed",
        })
    }
}
