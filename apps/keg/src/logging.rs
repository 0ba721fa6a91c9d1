//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so the
//! same run can be followed on the console or as JSON.

use keg_events::{AppEvent, CleanEvent, EventMessage, GeneralEvent, PlatformEvent};
use tracing::{debug, error, info, warn};

/// Log an `AppEvent` at its own level with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    match &message.event {
        AppEvent::General(general) => match general {
            GeneralEvent::Warning { message, context } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    context = ?context,
                    "{message}"
                );
            }
            GeneralEvent::Error { message, details } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    details = ?details,
                    "{message}"
                );
            }
            GeneralEvent::DebugLog { message, context } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    context = ?context,
                    "{message}"
                );
            }
            GeneralEvent::OperationStarted { operation } => {
                info!(source = meta.source.as_str(), operation = %operation, "Operation started");
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                info!(
                    source = meta.source.as_str(),
                    operation = %operation,
                    success = success,
                    "Operation completed"
                );
            }
            GeneralEvent::OperationFailed { operation, error } => {
                error!(
                    source = meta.source.as_str(),
                    operation = %operation,
                    error = %error,
                    "Operation failed"
                );
            }
        },

        AppEvent::Platform(platform) => match platform {
            PlatformEvent::OperationStarted { context } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    kind = ?context.kind,
                    operation = %context.operation,
                    target = ?context.target,
                    program = ?context.command.as_ref().map(|c| &c.program),
                    args = ?context.command.as_ref().map(|c| &c.args),
                    "Platform operation started"
                );
            }
            PlatformEvent::OperationCompleted { context, metrics } => {
                let metrics = metrics.clone().unwrap_or_default();
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    operation = %context.operation,
                    target = ?context.target,
                    duration_ms = ?metrics.duration_ms,
                    exit_code = ?metrics.exit_code,
                    "Platform operation completed"
                );
            }
            PlatformEvent::OperationFailed {
                context,
                failure,
                metrics,
            } => {
                let metrics = metrics.clone().unwrap_or_default();
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    operation = %context.operation,
                    target = ?context.target,
                    duration_ms = ?metrics.duration_ms,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Platform operation failed"
                );
            }
            PlatformEvent::ProviderResolved {
                platform,
                full_name,
            } => {
                info!(
                    source = meta.source.as_str(),
                    platform = %platform,
                    full_name = %full_name,
                    "Platform provider resolved"
                );
            }
        },

        AppEvent::Clean(clean) => log_clean_event(message, clean),
    }
}

fn log_clean_event(message: &EventMessage, event: &CleanEvent) {
    let meta = &message.meta;
    let correlation = meta.correlation_id.as_deref();
    match event {
        CleanEvent::Started { package, prefix } => {
            info!(
                source = meta.source.as_str(),
                correlation = ?correlation,
                package = %package,
                prefix = %prefix.display(),
                "Clean started"
            );
        }
        CleanEvent::DirectoryEntered { path } => {
            info!(source = meta.source.as_str(), path = %path.display(), "Cleaning directory");
        }
        CleanEvent::StaleFileRemoved { path } => {
            info!(source = meta.source.as_str(), path = %path.display(), "Removed stale file");
        }
        CleanEvent::BinaryStripped { path, hard_links } => {
            info!(
                source = meta.source.as_str(),
                path = %path.display(),
                hard_links = hard_links,
                "Stripped binary"
            );
        }
        CleanEvent::PermissionsSet {
            path,
            category,
            mode,
        } => {
            debug!(
                source = meta.source.as_str(),
                path = %path.display(),
                category = %category,
                mode = %format!("{mode:o}"),
                "Permissions set"
            );
        }
        CleanEvent::FileSkipped { path, reason } => {
            warn!(
                source = meta.source.as_str(),
                path = %path.display(),
                reason = %reason,
                "Skipped unclassifiable file"
            );
        }
        CleanEvent::InfoRemoved { path } => {
            info!(source = meta.source.as_str(), path = %path.display(), "Removed info directory");
        }
        CleanEvent::DirectoryPruned { path } => {
            info!(source = meta.source.as_str(), path = %path.display(), "Removed empty directory");
        }
        CleanEvent::Completed {
            package,
            files_inspected,
            binaries_stripped,
            stale_files_removed,
            directories_removed,
        } => {
            info!(
                source = meta.source.as_str(),
                correlation = ?correlation,
                package = %package,
                files_inspected = files_inspected,
                binaries_stripped = binaries_stripped,
                stale_files_removed = stale_files_removed,
                directories_removed = directories_removed,
                "Clean completed"
            );
        }
        CleanEvent::Failed { package, failure } => {
            error!(
                source = meta.source.as_str(),
                correlation = ?correlation,
                package = %package,
                retryable = failure.retryable,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Clean failed"
            );
        }
    }
}
