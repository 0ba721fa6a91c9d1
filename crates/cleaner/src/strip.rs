//! Symbol stripping that keeps hard links intact.
//!
//! `strip` replaces its target with a new file, which would silently split a
//! hard-linked binary into independent copies. When the inode has more than
//! one link the stripped output goes to a temporary file and its bytes are
//! written back into the existing inode instead.

use keg_errors::{CleanError, Error};
use keg_events::{CleanEvent, EventEmitter};
use keg_platform::fs::{link_count, overwrite_in_place, set_mode};
use keg_platform::process::execute_checked;
use keg_platform::{CapabilityProvider, PlatformCommand, PlatformContext};
use std::path::Path;
use std::sync::Arc;

use crate::package::InstalledPackage;

/// Mode a binary is given so `strip` can rewrite it
const WRITABLE_MODE: u32 = 0o644;

/// Prefix for the temporary file used when stripping hard-linked binaries
const TEMP_PREFIX: &str = "keg_strip";

/// Strips binaries through the platform's `strip` capability
#[derive(Debug, Clone)]
pub struct Stripper {
    provider: Arc<dyn CapabilityProvider>,
}

impl Stripper {
    #[must_use]
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self { provider }
    }

    /// Strip `path` unless the package protects it.
    ///
    /// Returns whether the file was stripped.
    ///
    /// # Errors
    ///
    /// See [`Stripper::strip`].
    pub async fn strip_if_allowed(
        &self,
        ctx: &PlatformContext,
        package: &InstalledPackage,
        path: &Path,
        extra_args: &[String],
    ) -> Result<bool, Error> {
        if package.is_protected(path) {
            return Ok(false);
        }
        self.strip(ctx, path, extra_args).await?;
        Ok(true)
    }

    /// Strip symbols from `path`, preserving its inode when it is hard-linked.
    ///
    /// The file is left with mode `0644`; the caller applies the final mode.
    ///
    /// # Errors
    ///
    /// Returns `StripError` if `strip` fails or the stripped bytes cannot be
    /// copied back, `FilesystemError` if the file cannot be made writable, and
    /// `UnsupportedCapability` if the platform has no `strip` or temp-file
    /// capability.
    pub async fn strip(
        &self,
        ctx: &PlatformContext,
        path: &Path,
        extra_args: &[String],
    ) -> Result<(), Error> {
        let strip_error = |message: String| CleanError::StripError {
            path: path.display().to_string(),
            message,
        };

        set_mode(path, WRITABLE_MODE)
            .await
            .map_err(|e| CleanError::FilesystemError {
                operation: "chmod".to_string(),
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let links = link_count(path)
            .await
            .map_err(|e| strip_error(e.to_string()))?;

        let mut cmd = PlatformCommand::new(self.provider.strip_command()?);
        cmd.args(extra_args);

        if links <= 1 {
            cmd.arg(path);
            execute_checked(ctx, &cmd)
                .await
                .map_err(|e| strip_error(e.to_string()))?;
        } else {
            let temp = self.provider.temp_file_path(ctx, TEMP_PREFIX).await?;
            cmd.arg("-o").arg(&temp).arg(path);

            let result = match execute_checked(ctx, &cmd).await {
                Ok(_) => overwrite_in_place(ctx, &temp, path)
                    .await
                    .map(|_| ())
                    .map_err(|e| strip_error(e.to_string())),
                Err(e) => Err(strip_error(e.to_string())),
            };

            if let Err(e) = tokio::fs::remove_file(&temp).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    ctx.emit_warning_with_context(
                        format!("could not remove temporary file {}", temp.display()),
                        e.to_string(),
                    );
                }
            }
            result?;
        }

        ctx.emit_clean(CleanEvent::BinaryStripped {
            path: path.to_path_buf(),
            hard_links: links,
        });
        Ok(())
    }
}
