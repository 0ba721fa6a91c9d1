//! Concrete platform backends

pub mod linux;
pub mod macos;

use keg_errors::PlatformError;
use std::path::PathBuf;
use std::sync::Arc;

use crate::capability::CapabilityProvider;
use crate::core::{PlatformContext, PlatformKind};
use crate::process::{execute_checked, PlatformCommand};

/// Build the backend for a detected platform
#[must_use]
pub fn provider_for(kind: PlatformKind) -> Arc<dyn CapabilityProvider> {
    match kind {
        PlatformKind::MacOS => Arc::new(macos::MacOSCapabilities::new()),
        PlatformKind::Linux => Arc::new(linux::LinuxCapabilities::new()),
    }
}

/// Whether a `uname -m` machine name denotes 64-bit hardware
pub(crate) fn machine_is_64_bit(machine: &str) -> bool {
    let machine = machine.trim();
    machine.ends_with("64") || matches!(machine, "ppc64le" | "s390x" | "mips64el")
}

/// Run `mktemp` with platform-specific arguments and return the created path
pub(crate) async fn run_mktemp<I, S>(
    ctx: &PlatformContext,
    mktemp: PathBuf,
    args: I,
) -> Result<PathBuf, PlatformError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut cmd = PlatformCommand::new(mktemp);
    cmd.args(args);
    let output = execute_checked(ctx, &cmd).await?;
    let path = output.stdout_trimmed();
    if path.is_empty() {
        return Err(PlatformError::ProcessExecutionFailed {
            command: cmd.display(),
            message: "mktemp printed no path".to_string(),
        });
    }
    Ok(PathBuf::from(path))
}

/// Run a host query command and return its trimmed stdout
pub(crate) async fn run_query(
    ctx: &PlatformContext,
    program: PathBuf,
    args: &[&str],
) -> Result<String, PlatformError> {
    let mut cmd = PlatformCommand::new(program);
    cmd.args(args);
    Ok(execute_checked(ctx, &cmd).await?.stdout_trimmed())
}
