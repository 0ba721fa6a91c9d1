//! Linux capability backend

use async_trait::async_trait;
use keg_errors::PlatformError;
use std::path::{Path, PathBuf};

use crate::capability::CapabilityProvider;
use crate::core::{PlatformContext, PlatformKind};
use crate::implementations::{machine_is_64_bit, run_mktemp, run_query};

const X11_LIBRARIES: &[&str] = &[
    "/usr/lib/libX11.so.6",
    "/usr/lib64/libX11.so.6",
    "/usr/lib/x86_64-linux-gnu/libX11.so.6",
    "/usr/lib/aarch64-linux-gnu/libX11.so.6",
];

/// Linux capability provider
///
/// Linux has no `pkgutil` and no Xcode; those capabilities keep the failing
/// defaults.
#[derive(Debug, Default)]
pub struct LinuxCapabilities;

impl LinuxCapabilities {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CapabilityProvider for LinuxCapabilities {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Linux
    }

    fn full_name(&self) -> &'static str {
        "Linux"
    }

    fn mktemp_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/bin/mktemp"))
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
        Ok(PathBuf::from("/bin/gzip"))
    }

    fn tar_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/bin/tar"))
    }

    fn unzip_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/unzip"))
    }

    fn curl_command(&self) -> Result<PathBuf, PlatformError> {
        Ok(PathBuf::from("/usr/bin/curl"))
    }

    async fn temp_file_path(
        &self,
        ctx: &PlatformContext,
        prefix: &str,
    ) -> Result<PathBuf, PlatformError> {
        // GNU mktemp needs an explicit XXXXXX template
        let template = format!("{prefix}.XXXXXXXX");
        run_mktemp(ctx, self.mktemp_command()?, ["-t", template.as_str()]).await
    }

    async fn full_version(&self, ctx: &PlatformContext) -> Result<String, PlatformError> {
        run_query(ctx, PathBuf::from("/bin/uname"), &["-r"]).await
    }

    async fn prefer_64_bit(&self, ctx: &PlatformContext) -> Result<bool, PlatformError> {
        let machine = run_query(ctx, PathBuf::from("/bin/uname"), &["-m"]).await?;
        Ok(machine_is_64_bit(&machine))
    }

    fn x11_installed(&self) -> Result<bool, PlatformError> {
        Ok(X11_LIBRARIES.iter().any(|p| Path::new(p).exists()))
    }
}
