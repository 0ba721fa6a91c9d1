//! macOS-specific capability backend

use async_trait::async_trait;
use keg_errors::PlatformError;
use std::path::{Path, PathBuf};

use crate::capability::CapabilityProvider;
use crate::core::{PlatformContext, PlatformKind};
use crate::implementations::{run_mktemp, run_query};
use crate::process::{execute_command, PlatformCommand};

/// macOS capability provider
#[derive(Debug, Default)]
pub struct MacOSCapabilities;

impl MacOSCapabilities {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CapabilityProvider for MacOSCapabilities {
    fn kind(&self) -> PlatformKind {
        PlatformKind::MacOS
    }

    fn full_name(&self) -> &'static str {
        "Mac OS X"
    }

    fn mktemp_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/mktemp"))
    }

    fn strip_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/strip"))
    }

    fn concat_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/bin/cat"))
    }

    fn type_probe_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/file"))
    }

    fn column_pager_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/pr"))
    }

    fn terminal_size_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/bin/stty"))
    }

    fn tput_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/tput"))
    }

    fn which_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/which"))
    }

    fn gzip_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/gzip"))
    }

    fn tar_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/tar"))
    }

    fn unzip_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/unzip"))
    }

    fn curl_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/curl"))
    }

    fn pkgutil_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/sbin/pkgutil"))
    }

    fn xcode_select_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/xcode-select"))
    }

    async fn temp_file_path(
        &self,
        ctx: &PlatformContext,
        prefix: &str,
    ) -> Result<PathBuf, PlatformError> {
        // BSD mktemp appends its own random suffix to a -t prefix
        run_mktemp(ctx, self.mktemp_command()?, ["-t", prefix]).await
    }

    async fn full_version(&self, ctx: &PlatformContext) -> Result<String, PlatformError> {
        run_query(ctx, PathBuf::from("/usr/bin/sw_vers"), &["-productVersion"]).await
    }

    async fn prefer_64_bit(&self, ctx: &PlatformContext) -> Result<bool, PlatformError> {
        let capable = run_query(
            ctx,
            PathBuf::from("/usr/sbin/sysctl"),
            &["-n", "hw.cpu64bit_capable"],
        )
        .await?;
        if capable != "1" {
            return Ok(false);
        }
        // 64-bit userland became the default with 10.6
        Ok(self.os_version(ctx).await?.at_least(10, 6))
    }

    fn x11_installed(&self) -> Result<bool, PlatformError> {
        Ok(["/usr/X11/lib/libpng.dylib", "/opt/X11/lib/libpng.dylib"]
            .iter()
            .any(|p| Path::new(p).exists()))
    }

    async fn xcode_prefix(&self, ctx: &PlatformContext) -> Result<Option<PathBuf>, PlatformError> {
        let mut cmd = PlatformCommand::new(self.xcode_select_command()?);
        cmd.arg("-print-path");
        // A missing or failing xcode-select is not fatal; fall through to /Developer
        if let Ok(output) = execute_command(ctx, &cmd).await {
            let path = PathBuf::from(output.stdout_trimmed());
            if output.status.success() && path.is_absolute() && path.is_dir() {
                return Ok(Some(path));
            }
        }

        let developer = Path::new("/Developer");
        Ok(developer.is_dir().then(|| developer.to_path_buf()))
    }
}
