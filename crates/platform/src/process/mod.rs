//! Process execution for external platform tools

use keg_errors::PlatformError;
use keg_events::{
    AppEvent, EventEmitter, FailureContext, PlatformEvent, PlatformOperationContext,
    PlatformOperationKind, PlatformOperationMetrics, ProcessCommandDescriptor,
};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::core::PlatformContext;

/// Platform-specific command builder
#[derive(Debug, Clone)]
pub struct PlatformCommand {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl PlatformCommand {
    /// Create a new platform command
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_os_string());
        }
        self
    }

    /// Set the working directory for the command
    pub fn current_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Get the program path
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments
    #[must_use]
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Get the current directory
    #[must_use]
    pub fn get_current_dir(&self) -> Option<&PathBuf> {
        self.current_dir.as_ref()
    }

    /// Human readable `program arg arg` form for diagnostics
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy())
            .chain(self.args.iter().map(|a| a.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn descriptor(&self) -> ProcessCommandDescriptor {
        ProcessCommandDescriptor {
            program: self.program.to_string_lossy().into_owned(),
            args: self
                .args
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
            cwd: self.current_dir.clone(),
        }
    }
}

/// Output from command execution
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Stdout decoded lossily and trimmed
    #[must_use]
    pub fn stdout_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    /// Stderr decoded lossily and trimmed
    #[must_use]
    pub fn stderr_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

fn process_context(descriptor: ProcessCommandDescriptor) -> PlatformOperationContext {
    PlatformOperationContext {
        kind: PlatformOperationKind::Process,
        operation: "execute_command".to_string(),
        target: None,
        command: Some(descriptor),
    }
}

fn process_metrics(duration: Duration, output: Option<&CommandOutput>) -> PlatformOperationMetrics {
    PlatformOperationMetrics {
        duration_ms: Some(duration_to_millis(duration)),
        exit_code: output.and_then(|o| o.status.code()),
        stdout_bytes: output.and_then(|o| u64::try_from(o.stdout.len()).ok()),
        stderr_bytes: output.and_then(|o| u64::try_from(o.stderr.len()).ok()),
    }
}

pub(crate) fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Run a command to completion, capturing its output.
///
/// A non-zero exit status is *not* an error here; callers that need success
/// use [`execute_checked`].
///
/// # Errors
///
/// Returns `ProcessExecutionFailed` if the program could not be spawned.
pub async fn execute_command(
    ctx: &PlatformContext,
    cmd: &PlatformCommand,
) -> Result<CommandOutput, PlatformError> {
    let start = Instant::now();
    let descriptor = cmd.descriptor();

    ctx.emit(AppEvent::Platform(PlatformEvent::OperationStarted {
        context: process_context(descriptor.clone()),
    }));

    let mut command = Command::new(cmd.program());
    command.args(cmd.get_args());
    if let Some(dir) = cmd.get_current_dir() {
        command.current_dir(dir);
    }

    let result = command
        .output()
        .await
        .map(|output| CommandOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
        .map_err(|e| PlatformError::ProcessExecutionFailed {
            command: cmd.display(),
            message: e.to_string(),
        });

    let duration = start.elapsed();
    match &result {
        Ok(output) => ctx.emit(AppEvent::Platform(PlatformEvent::OperationCompleted {
            context: process_context(descriptor),
            metrics: Some(process_metrics(duration, Some(output))),
        })),
        Err(e) => ctx.emit(AppEvent::Platform(PlatformEvent::OperationFailed {
            context: process_context(descriptor),
            failure: FailureContext::from_error(e),
            metrics: Some(process_metrics(duration, None)),
        })),
    }

    result
}

/// Run a command and require a zero exit status.
///
/// # Errors
///
/// Returns `ProcessExecutionFailed` if the program could not be spawned or
/// exited unsuccessfully; the message carries its stderr.
pub async fn execute_checked(
    ctx: &PlatformContext,
    cmd: &PlatformCommand,
) -> Result<CommandOutput, PlatformError> {
    let output = execute_command(ctx, cmd).await?;
    if output.status.success() {
        Ok(output)
    } else {
        let stderr = output.stderr_trimmed();
        Err(PlatformError::ProcessExecutionFailed {
            command: cmd.display(),
            message: if stderr.is_empty() {
                output.status.to_string()
            } else {
                format!("{}: {stderr}", output.status)
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let ctx = PlatformContext::default();
        let mut cmd = PlatformCommand::new("/bin/sh");
        cmd.args(["-c", "printf hello"]);
        let output = execute_checked(&ctx, &cmd).await.unwrap();
        assert_eq!(output.stdout_trimmed(), "hello");
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let ctx = PlatformContext::default();
        let mut cmd = PlatformCommand::new("/bin/sh");
        cmd.args(["-c", "echo broken >&2; exit 3"]);

        let output = execute_command(&ctx, &cmd).await.unwrap();
        assert_eq!(output.status.code(), Some(3));

        let err = execute_checked(&ctx, &cmd).await.unwrap_err();
        assert!(matches!(err, PlatformError::ProcessExecutionFailed { message, .. } if message.contains("broken")));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let ctx = PlatformContext::default();
        let cmd = PlatformCommand::new("/nonexistent/keg-tool");
        let err = execute_command(&ctx, &cmd).await.unwrap_err();
        assert!(matches!(err, PlatformError::ProcessExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn emits_process_events() {
        let (tx, mut rx) = keg_events::channel();
        let ctx = PlatformContext::new(Some(tx));
        let mut cmd = PlatformCommand::new("/bin/sh");
        cmd.args(["-c", "true"]);
        execute_checked(&ctx, &cmd).await.unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::Platform(PlatformEvent::OperationStarted { .. }))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::Platform(PlatformEvent::OperationCompleted { .. }))
        ));
    }
}
