//! Cleaner events
//!
//! These replace the plain-text lines (`cleandir:`, `strip`, `rmdir: ... (empty)`)
//! a post-install cleaner traditionally prints. They are advisory only.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CleanEvent {
    /// Cleaning of a package began
    Started { package: String, prefix: PathBuf },

    /// A watched directory is being walked
    DirectoryEntered { path: PathBuf },

    /// A stale build-metadata file was deleted
    StaleFileRemoved { path: PathBuf },

    /// A binary had its symbols stripped
    BinaryStripped {
        path: PathBuf,
        /// Hard-link count of the inode at the time of stripping
        hard_links: u64,
    },

    /// Final permission bits were applied to a file
    PermissionsSet {
        path: PathBuf,
        category: String,
        mode: u32,
    },

    /// A file was left alone because its type could not be determined
    FileSkipped { path: PathBuf, reason: String },

    /// The package's info directory was removed
    InfoRemoved { path: PathBuf },

    /// An empty directory was removed
    DirectoryPruned { path: PathBuf },

    /// Cleaning finished
    Completed {
        package: String,
        files_inspected: usize,
        binaries_stripped: usize,
        stale_files_removed: usize,
        directories_removed: usize,
    },

    /// Cleaning aborted
    Failed {
        package: String,
        failure: FailureContext,
    },
}
