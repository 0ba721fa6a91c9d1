//! Results produced by CLI commands

use keg_cleaner::CleanReport;
use keg_platform::{CapabilityProvider, PlatformContext};
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one command, rendered as text or JSON
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandResult {
    Clean {
        package: String,
        prefix: PathBuf,
        report: CleanReport,
    },
    Platform(PlatformReport),
}

impl CommandResult {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Serialize)]
pub struct ToolEntry {
    pub capability: String,
    /// `None` when the platform does not define the tool
    pub path: Option<PathBuf>,
}

/// Everything the capability provider knows about the host.
///
/// Queries that fail are reported as `None` rather than aborting the listing.
#[derive(Debug, Serialize)]
pub struct PlatformReport {
    pub platform: String,
    pub full_name: String,
    pub version: Option<String>,
    pub prefer_64_bit: Option<bool>,
    pub x11_installed: Option<bool>,
    pub xcode_prefix: Option<PathBuf>,
    pub terminal_columns: Option<u16>,
    pub tools: Vec<ToolEntry>,
}

impl PlatformReport {
    pub async fn gather(ctx: &PlatformContext, provider: &dyn CapabilityProvider) -> Self {
        let tools = provider
            .tool_table()
            .into_iter()
            .map(|(cap, resolved)| ToolEntry {
                capability: cap.name().to_string(),
                path: resolved.ok(),
            })
            .collect();

        Self {
            platform: provider.kind().to_string(),
            full_name: provider.full_name().to_string(),
            version: provider.full_version(ctx).await.ok(),
            prefer_64_bit: provider.prefer_64_bit(ctx).await.ok(),
            x11_installed: provider.x11_installed().ok(),
            xcode_prefix: provider.xcode_prefix(ctx).await.ok().flatten(),
            terminal_columns: provider.terminal_columns(ctx).await.ok(),
            tools,
        }
    }
}
