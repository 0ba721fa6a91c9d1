//! Platform-specific operation events

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Which layer of the platform abstraction an operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformOperationKind {
    /// External tool invocation (`file`, `strip`, `mktemp`, ...)
    Process,
    /// Direct filesystem manipulation (in-place overwrite)
    Filesystem,
    /// Capability provider resolution
    Capability,
}

/// Program, arguments and working directory of a spawned tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessCommandDescriptor {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

/// What an operation was doing and to what
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformOperationContext {
    pub kind: PlatformOperationKind,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<ProcessCommandDescriptor>,
}

/// Timing and output sizes for a finished operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformOperationMetrics {
    pub duration_ms: Option<u64>,
    pub exit_code: Option<i32>,
    pub stdout_bytes: Option<u64>,
    pub stderr_bytes: Option<u64>,
}

/// Platform operation events for tracking platform-specific operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Operation started
    OperationStarted { context: PlatformOperationContext },

    /// Operation completed successfully
    OperationCompleted {
        context: PlatformOperationContext,
        metrics: Option<PlatformOperationMetrics>,
    },

    /// Operation failed
    OperationFailed {
        context: PlatformOperationContext,
        failure: FailureContext,
        metrics: Option<PlatformOperationMetrics>,
    },

    /// The process-wide capability provider was resolved
    ProviderResolved {
        /// Detected platform kind (`macos`, `linux`)
        platform: String,
        /// Human readable platform name
        full_name: String,
    },
}
