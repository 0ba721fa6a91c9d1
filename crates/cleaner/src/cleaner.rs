//! The cleaning pass over an installed prefix

use keg_config::CleanerConfig;
use keg_errors::{CleanError, Error};
use keg_events::{CleanEvent, EventEmitter, EventSender, FailureContext};
use keg_platform::fs::set_mode;
use keg_platform::implementations::provider_for;
use keg_platform::{CapabilityProvider, PlatformContext, PlatformKind};
use serde::Serialize;
use std::cmp::Reverse;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::classify::{classify, FileCategory};
use crate::package::InstalledPackage;
use crate::prune::{collect_directories, prune_empty};
use crate::strip::Stripper;

/// What a clean did. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub files_inspected: usize,
    pub binaries_stripped: usize,
    pub stale_files_removed: usize,
    pub files_skipped: usize,
    pub info_removed: bool,
    pub directories_removed: usize,
}

/// Normalises an installed package: strips executables, fixes permissions,
/// deletes stale build metadata and prunes empty directories.
#[derive(Debug, Clone)]
pub struct Cleaner {
    provider: Arc<dyn CapabilityProvider>,
    stripper: Stripper,
    config: CleanerConfig,
    event_sender: Option<EventSender>,
}

impl Cleaner {
    #[must_use]
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self {
            stripper: Stripper::new(Arc::clone(&provider)),
            provider,
            config: CleanerConfig::default(),
            event_sender: None,
        }
    }

    /// A cleaner driven by the process-wide platform provider.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` on hosts other than macOS and Linux.
    pub fn for_current_platform() -> Result<Self, Error> {
        Ok(Self::new(keg_platform::provider()?))
    }

    /// A cleaner for the named operating system, as reported by `uname -s`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` for anything but macOS and Linux.
    pub fn for_os(os_name: &str) -> Result<Self, Error> {
        Ok(Self::new(provider_for(PlatformKind::from_os_name(os_name)?)))
    }

    #[must_use]
    pub fn with_config(mut self, config: CleanerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Clean `package` in place.
    ///
    /// Every step is idempotent; re-running after a failure picks up where
    /// the previous run stopped. Nothing is rolled back on error.
    ///
    /// # Errors
    ///
    /// Fails on the first classification, strip or filesystem error, and with
    /// `UnsupportedCapability` if the platform lacks a required tool.
    pub async fn clean(&self, package: &InstalledPackage) -> Result<CleanReport, Error> {
        let ctx = PlatformContext::with_package(self.event_sender.clone(), package.name());
        ctx.emit_clean(CleanEvent::Started {
            package: package.name().to_string(),
            prefix: package.prefix().to_path_buf(),
        });

        match self.run(&ctx, package).await {
            Ok(report) => {
                ctx.emit_clean(CleanEvent::Completed {
                    package: package.name().to_string(),
                    files_inspected: report.files_inspected,
                    binaries_stripped: report.binaries_stripped,
                    stale_files_removed: report.stale_files_removed,
                    directories_removed: report.directories_removed,
                });
                Ok(report)
            }
            Err(e) => {
                ctx.emit_clean(CleanEvent::Failed {
                    package: package.name().to_string(),
                    failure: FailureContext::from_error(&e),
                });
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        ctx: &PlatformContext,
        package: &InstalledPackage,
    ) -> Result<CleanReport, Error> {
        let mut report = CleanReport::default();

        for dir in package.watched_dirs() {
            // A symlinked watched directory points outside the prefix
            if is_real_dir(&dir).await {
                self.clean_dir(ctx, package, &dir, &mut report).await?;
            }
        }

        report.info_removed = self.remove_info(ctx, package).await?;

        let dirs = collect_directories(package)?;
        report.directories_removed = prune_empty(ctx, package, dirs).await?;

        Ok(report)
    }

    /// Walk one watched directory depth-first without following symlinks
    async fn clean_dir(
        &self,
        ctx: &PlatformContext,
        package: &InstalledPackage,
        root: &Path,
        report: &mut CleanReport,
    ) -> Result<(), Error> {
        ctx.emit_directory_entered(root);

        let mut walker = WalkDir::new(root)
            .follow_links(false)
            .follow_root_links(false)
            .into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                // An unreadable root means there is nothing to clean here
                Err(e) if e.depth() == 0 => return Ok(()),
                Err(e) if e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) => {
                    continue;
                }
                Err(e) => {
                    return Err(CleanError::WalkFailed {
                        root: root.display().to_string(),
                        message: e.to_string(),
                    }
                    .into())
                }
            };
            let path = entry.path();

            if entry.file_type().is_dir() {
                if package.is_protected(path) {
                    walker.skip_current_dir();
                }
                continue;
            }

            // Regular files only, after following links; dangling links and
            // special files are skipped
            match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }

            if self.is_stale(path) {
                if !package.is_protected(path) {
                    remove_file_if_present(path).await?;
                    report.stale_files_removed += 1;
                    ctx.emit_clean(CleanEvent::StaleFileRemoved {
                        path: path.to_path_buf(),
                    });
                }
                continue;
            }

            if entry.path_is_symlink() || package.is_protected(path) {
                continue;
            }

            report.files_inspected += 1;
            self.clean_file(ctx, package, path, report).await?;
        }

        Ok(())
    }

    async fn clean_file(
        &self,
        ctx: &PlatformContext,
        package: &InstalledPackage,
        path: &Path,
        report: &mut CleanReport,
    ) -> Result<(), Error> {
        let category = match classify(ctx, self.provider.as_ref(), path).await {
            Ok(category) => category,
            Err(Error::Clean(CleanError::ClassificationError { message, .. }))
                if self.config.skip_unclassifiable =>
            {
                report.files_skipped += 1;
                ctx.emit_clean(CleanEvent::FileSkipped {
                    path: path.to_path_buf(),
                    reason: message,
                });
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if category.needs_strip()
            && self
                .stripper
                .strip_if_allowed(ctx, package, path, &self.config.strip_args)
                .await?
        {
            report.binaries_stripped += 1;
        }

        apply_mode(ctx, path, category).await
    }

    fn is_stale(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.config.stale_extensions.iter().any(|s| s == ext))
    }

    /// Remove `<prefix>/share/info` unless it sits under a protected path or is
    /// configured to stay. Protected entries inside it survive along with the
    /// directories that hold them.
    async fn remove_info(
        &self,
        ctx: &PlatformContext,
        package: &InstalledPackage,
    ) -> Result<bool, Error> {
        let info = package.info();
        if self.config.keep_info
            || package.is_protected_within(&info)
            || !is_real_dir(&info).await
        {
            return Ok(false);
        }

        remove_unprotected(package, &info).await?;
        if tokio::fs::symlink_metadata(&info).await.is_ok() {
            return Ok(false);
        }
        ctx.emit_clean(CleanEvent::InfoRemoved { path: info });
        Ok(true)
    }
}

async fn is_real_dir(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path)
        .await
        .is_ok_and(|meta| meta.is_dir())
}

fn fs_error(operation: &str, path: &Path, err: &std::io::Error) -> Error {
    CleanError::FilesystemError {
        operation: operation.to_string(),
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}

/// Delete everything under `root` that is not protected, then every directory
/// left empty, deepest first
async fn remove_unprotected(package: &InstalledPackage, root: &Path) -> Result<(), Error> {
    let mut dirs = Vec::new();
    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .follow_root_links(false)
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) => continue,
            Err(e) => {
                return Err(CleanError::WalkFailed {
                    root: root.display().to_string(),
                    message: e.to_string(),
                }
                .into())
            }
        };
        if package.is_protected(entry.path()) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }
        if entry.file_type().is_dir() {
            dirs.push((entry.depth(), entry.into_path()));
        } else {
            remove_file_if_present(entry.path()).await?;
        }
    }

    dirs.sort_by_key(|(depth, _)| Reverse(*depth));
    for (_, dir) in dirs {
        match tokio::fs::remove_dir(&dir).await {
            Ok(()) => {}
            // Still holds something protected
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty) => {}
            Err(e) => return Err(fs_error("rmdir", &dir, &e)),
        }
    }
    Ok(())
}

async fn remove_file_if_present(path: &Path) -> Result<(), Error> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(fs_error("unlink", path, &e)),
    }
}

async fn apply_mode(ctx: &PlatformContext, path: &Path, category: FileCategory) -> Result<(), Error> {
    let mode = category.final_mode();
    set_mode(path, mode)
        .await
        .map_err(|e| CleanError::FilesystemError {
            operation: "chmod".to_string(),
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    ctx.emit_clean(CleanEvent::PermissionsSet {
        path: path.to_path_buf(),
        category: category.to_string(),
        mode,
    });
    Ok(())
}
