//! The capability surface every platform backend exposes.
//!
//! Each capability is a trait method whose default fails with
//! `UnsupportedCapability`. Backends override exactly the capabilities their
//! host provides, so a gap surfaces at the call site instead of as an empty
//! path or a silently wrong default.

use async_trait::async_trait;
use keg_errors::PlatformError;
use std::fmt;
use std::path::PathBuf;

use crate::core::{OsVersion, PlatformContext, PlatformKind};
use crate::process::{execute_command, PlatformCommand};

/// Terminal width assumed when the real one cannot be determined
pub const DEFAULT_TERMINAL_COLUMNS: u16 = 80;

/// Names of every capability, used for error messages and tool listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Mktemp,
    Strip,
    Concat,
    TypeProbe,
    ColumnPager,
    TerminalSize,
    Tput,
    Which,
    Gzip,
    Tar,
    Unzip,
    Curl,
    Pkgutil,
    XcodeSelect,
    TempFilePath,
    FullVersion,
    Prefer64Bit,
    X11,
    XcodePrefix,
}

impl Capability {
    /// Capabilities that resolve to a tool path
    pub const TOOLS: [Capability; 14] = [
        Self::Mktemp,
        Self::Strip,
        Self::Concat,
        Self::TypeProbe,
        Self::ColumnPager,
        Self::TerminalSize,
        Self::Tput,
        Self::Which,
        Self::Gzip,
        Self::Tar,
        Self::Unzip,
        Self::Curl,
        Self::Pkgutil,
        Self::XcodeSelect,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Mktemp => "mktemp",
            Self::Strip => "strip",
            Self::Concat => "cat",
            Self::TypeProbe => "file",
            Self::ColumnPager => "pr",
            Self::TerminalSize => "stty",
            Self::Tput => "tput",
            Self::Which => "which",
            Self::Gzip => "gzip",
            Self::Tar => "tar",
            Self::Unzip => "unzip",
            Self::Curl => "curl",
            Self::Pkgutil => "pkgutil",
            Self::XcodeSelect => "xcode-select",
            Self::TempFilePath => "temp_file_path",
            Self::FullVersion => "full_version",
            Self::Prefer64Bit => "prefer_64_bit",
            Self::X11 => "x11_installed",
            Self::XcodePrefix => "xcode_prefix",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Platform capability provider
///
/// Implemented by [`crate::MacOSCapabilities`] and [`crate::LinuxCapabilities`];
/// tests and embedders may supply their own.
#[async_trait]
pub trait CapabilityProvider: Send + Sync + fmt::Debug {
    /// Which platform this provider drives
    fn kind(&self) -> PlatformKind;

    /// Human readable platform name ("Mac OS X", "Linux")
    fn full_name(&self) -> &'static str;

    /// The error every unimplemented capability returns
    fn unsupported(&self, capability: Capability) -> PlatformError {
        PlatformError::unsupported_capability(capability.name(), self.full_name())
    }

    fn mktemp_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::Mktemp))
    }

    fn strip_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::Strip))
    }

    fn concat_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::Concat))
    }

    /// Content-sniffing utility (`file`)
    fn type_probe_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::TypeProbe))
    }

    fn column_pager_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::ColumnPager))
    }

    fn terminal_size_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::TerminalSize))
    }

    fn tput_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::Tput))
    }

    fn which_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::Which))
    }

    fn gzip_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::Gzip))
    }

    fn tar_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::Tar))
    }

    fn unzip_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::Unzip))
    }

    fn curl_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::Curl))
    }

    fn pkgutil_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::Pkgutil))
    }

    fn xcode_select_command(&self) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::XcodeSelect))
    }

    /// Create a fresh empty temporary file and return its path
    async fn temp_file_path(
        &self,
        _ctx: &PlatformContext,
        _prefix: &str,
    ) -> Result<PathBuf, PlatformError> {
        Err(self.unsupported(Capability::TempFilePath))
    }

    /// Raw OS version string
    async fn full_version(&self, _ctx: &PlatformContext) -> Result<String, PlatformError> {
        Err(self.unsupported(Capability::FullVersion))
    }

    async fn prefer_64_bit(&self, _ctx: &PlatformContext) -> Result<bool, PlatformError> {
        Err(self.unsupported(Capability::Prefer64Bit))
    }

    fn x11_installed(&self) -> Result<bool, PlatformError> {
        Err(self.unsupported(Capability::X11))
    }

    /// Developer tools root (`/Developer`, `/Applications/Xcode.app/...`)
    async fn xcode_prefix(&self, _ctx: &PlatformContext) -> Result<Option<PathBuf>, PlatformError> {
        Err(self.unsupported(Capability::XcodePrefix))
    }

    /// Parsed OS version
    async fn os_version(&self, ctx: &PlatformContext) -> Result<OsVersion, PlatformError> {
        let raw = self.full_version(ctx).await?;
        OsVersion::parse(&raw)
    }

    /// Terminal width in columns, falling back to 80 when it cannot be read
    async fn terminal_columns(&self, ctx: &PlatformContext) -> Result<u16, PlatformError> {
        let mut cmd = PlatformCommand::new(self.tput_command()?);
        cmd.arg("cols");
        let output = execute_command(ctx, &cmd).await?;
        let columns = output
            .stdout_trimmed()
            .parse::<u16>()
            .ok()
            .filter(|c| *c > 0)
            .unwrap_or(DEFAULT_TERMINAL_COLUMNS);
        Ok(columns)
    }

    /// Locate `program` on `PATH`
    async fn which(
        &self,
        ctx: &PlatformContext,
        program: &str,
    ) -> Result<Option<PathBuf>, PlatformError> {
        let mut cmd = PlatformCommand::new(self.which_command()?);
        cmd.arg(program);
        let output = execute_command(ctx, &cmd).await?;
        let found = output.stdout_trimmed();
        if output.status.success() && !found.is_empty() {
            Ok(Some(PathBuf::from(found)))
        } else {
            Ok(None)
        }
    }

    /// Single dispatch point from a capability name to its tool path
    fn tool(&self, capability: Capability) -> Result<PathBuf, PlatformError> {
        match capability {
            Capability::Mktemp => self.mktemp_command(),
            Capability::Strip => self.strip_command(),
            Capability::Concat => self.concat_command(),
            Capability::TypeProbe => self.type_probe_command(),
            Capability::ColumnPager => self.column_pager_command(),
            Capability::TerminalSize => self.terminal_size_command(),
            Capability::Tput => self.tput_command(),
            Capability::Which => self.which_command(),
            Capability::Gzip => self.gzip_command(),
            Capability::Tar => self.tar_command(),
            Capability::Unzip => self.unzip_command(),
            Capability::Curl => self.curl_command(),
            Capability::Pkgutil => self.pkgutil_command(),
            Capability::XcodeSelect => self.xcode_select_command(),
            other => Err(self.unsupported(other)),
        }
    }

    /// Every tool capability with its resolution on this platform
    fn tool_table(&self) -> Vec<(Capability, Result<PathBuf, PlatformError>)> {
        Capability::TOOLS
            .iter()
            .map(|cap| (*cap, self.tool(*cap)))
            .collect()
    }
}
