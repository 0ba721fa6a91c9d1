//! Filesystem helpers the cleaner needs beyond plain `tokio::fs`.
//!
//! The important one is [`overwrite_in_place`]: it rewrites the bytes of an
//! existing inode instead of replacing the directory entry, so every hard link
//! to the target observes the new content.

use keg_errors::PlatformError;
use keg_events::{
    AppEvent, EventEmitter, FailureContext, PlatformEvent, PlatformOperationContext,
    PlatformOperationKind, PlatformOperationMetrics,
};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use std::time::Instant;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::core::PlatformContext;
use crate::process::duration_to_millis;

fn fs_error(operation: &str, path: &Path, err: &std::io::Error) -> PlatformError {
    PlatformError::FilesystemOperationFailed {
        operation: operation.to_string(),
        message: format!("{}: {err}", path.display()),
    }
}

fn fs_context(operation: &str, target: &Path) -> PlatformOperationContext {
    PlatformOperationContext {
        kind: PlatformOperationKind::Filesystem,
        operation: operation.to_string(),
        target: Some(target.to_path_buf()),
        command: None,
    }
}

/// Copy the bytes of `src` over the existing file at `dst`, keeping `dst`'s inode.
///
/// `dst` must already exist; it is opened for writing and truncated, never
/// created or renamed over. Returns the number of bytes written.
///
/// # Errors
///
/// Returns `FilesystemOperationFailed` if either file cannot be opened or the copy fails.
pub async fn overwrite_in_place(
    ctx: &PlatformContext,
    src: &Path,
    dst: &Path,
) -> Result<u64, PlatformError> {
    const OPERATION: &str = "overwrite_in_place";
    let start = Instant::now();
    ctx.emit(AppEvent::Platform(PlatformEvent::OperationStarted {
        context: fs_context(OPERATION, dst),
    }));

    let result: Result<u64, PlatformError> = async {
        let mut reader = fs::File::open(src)
            .await
            .map_err(|e| fs_error(OPERATION, src, &e))?;
        let mut writer = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(dst)
            .await
            .map_err(|e| fs_error(OPERATION, dst, &e))?;
        let written = tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| fs_error(OPERATION, dst, &e))?;
        writer
            .flush()
            .await
            .map_err(|e| fs_error(OPERATION, dst, &e))?;
        writer
            .sync_all()
            .await
            .map_err(|e| fs_error(OPERATION, dst, &e))?;
        Ok(written)
    }
    .await;

    let metrics = PlatformOperationMetrics {
        duration_ms: Some(duration_to_millis(start.elapsed())),
        ..PlatformOperationMetrics::default()
    };
    match &result {
        Ok(_) => ctx.emit(AppEvent::Platform(PlatformEvent::OperationCompleted {
            context: fs_context(OPERATION, dst),
            metrics: Some(metrics),
        })),
        Err(e) => ctx.emit(AppEvent::Platform(PlatformEvent::OperationFailed {
            context: fs_context(OPERATION, dst),
            failure: FailureContext::from_error(e),
            metrics: Some(metrics),
        })),
    }

    result
}

/// Set the permission bits of `path` to exactly `mode`.
///
/// # Errors
///
/// Returns `FilesystemOperationFailed` if the chmod fails.
pub async fn set_mode(path: &Path, mode: u32) -> Result<(), PlatformError> {
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| fs_error("chmod", path, &e))
}

/// Hard-link count of the inode `path` resolves to.
///
/// # Errors
///
/// Returns `FilesystemOperationFailed` if the file cannot be stat'ed.
pub async fn link_count(path: &Path) -> Result<u64, PlatformError> {
    fs::metadata(path)
        .await
        .map(|m| m.nlink())
        .map_err(|e| fs_error("stat", path, &e))
}
