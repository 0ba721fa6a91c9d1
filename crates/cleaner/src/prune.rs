//! Empty-directory pruning, deepest first

use keg_errors::{CleanError, Error};
use keg_events::{CleanEvent, EventEmitter};
use keg_platform::PlatformContext;
use std::cmp::Reverse;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::package::InstalledPackage;

/// A directory collected for pruning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub path: PathBuf,
    /// Depth below the package prefix; direct children are 1
    pub depth: usize,
}

fn walk_error(root: &Path, err: &walkdir::Error) -> CleanError {
    CleanError::WalkFailed {
        root: root.display().to_string(),
        message: err.to_string(),
    }
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|io| io.kind() == ErrorKind::NotFound)
}

/// Collect every directory strictly below the package prefix.
///
/// Protected directories are neither collected nor descended into. A missing
/// or unreadable prefix yields nothing.
///
/// # Errors
///
/// Returns `WalkFailed` if part of the tree cannot be read.
pub fn collect_directories(package: &InstalledPackage) -> Result<Vec<DirectoryEntry>, Error> {
    let prefix = package.prefix();
    let mut dirs = Vec::new();
    let mut walker = WalkDir::new(prefix)
        .min_depth(1)
        .follow_links(false)
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Ok(Vec::new()),
            Err(e) if is_not_found(&e) => continue,
            Err(e) => return Err(walk_error(prefix, &e).into()),
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if package.is_protected(entry.path()) {
            walker.skip_current_dir();
            continue;
        }
        let depth = entry.depth();
        dirs.push(DirectoryEntry {
            path: entry.into_path(),
            depth,
        });
    }

    Ok(dirs)
}

async fn is_empty_dir(path: &Path) -> std::io::Result<bool> {
    let mut entries = tokio::fs::read_dir(path).await?;
    Ok(entries.next_entry().await?.is_none())
}

/// Remove every empty, unprotected directory in `dirs`, deepest first.
///
/// Removing a child can empty its parent, so depth order matters. Entries
/// that disappear concurrently are ignored. Returns the number removed.
///
/// # Errors
///
/// Returns `FilesystemError` for any failure other than `NotFound`.
pub async fn prune_empty(
    ctx: &PlatformContext,
    package: &InstalledPackage,
    mut dirs: Vec<DirectoryEntry>,
) -> Result<usize, Error> {
    dirs.sort_by_key(|d| Reverse(d.depth));

    let fs_error = |operation: &str, path: &Path, err: &std::io::Error| {
        CleanError::FilesystemError {
            operation: operation.to_string(),
            path: path.display().to_string(),
            message: err.to_string(),
        }
    };

    let mut removed = 0;
    for dir in dirs {
        if package.is_protected(&dir.path) {
            continue;
        }
        match is_empty_dir(&dir.path).await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(fs_error("read_dir", &dir.path, &e).into()),
        }
        match tokio::fs::remove_dir(&dir.path).await {
            Ok(()) => {
                removed += 1;
                ctx.emit_clean(CleanEvent::DirectoryPruned { path: dir.path });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(fs_error("rmdir", &dir.path, &e).into()),
        }
    }

    Ok(removed)
}
