//! Output rendering and formatting

use console::{Style, Term};
use std::io;

use crate::report::{CommandResult, PlatformReport};
use keg_cleaner::CleanReport;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    json_output: bool,
    colors_enabled: bool,
    term: Term,
}

impl OutputRenderer {
    pub fn new(json_output: bool, colors_enabled: bool) -> Self {
        Self {
            json_output,
            colors_enabled,
            term: Term::stdout(),
        }
    }

    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let json = result.to_json().map_err(io::Error::other)?;
            self.term.write_line(&json)
        } else {
            match result {
                CommandResult::Clean {
                    package, report, ..
                } => self.render_clean_report(package, report),
                CommandResult::Platform(report) => self.render_platform_report(report),
            }
        }
    }

    fn bold(&self) -> Style {
        if self.colors_enabled {
            Style::new().bold()
        } else {
            Style::new()
        }
    }

    fn dim(&self) -> Style {
        if self.colors_enabled {
            Style::new().dim()
        } else {
            Style::new()
        }
    }

    fn render_clean_report(&self, package: &str, report: &CleanReport) -> io::Result<()> {
        self.term
            .write_line(&format!("{} cleaned", self.bold().apply_to(package)))?;
        self.term.write_line(&format!(
            "  {} files inspected, {} stripped, {} stale removed, {} skipped",
            report.files_inspected,
            report.binaries_stripped,
            report.stale_files_removed,
            report.files_skipped
        ))?;
        self.term.write_line(&format!(
            "  {} empty directories removed{}",
            report.directories_removed,
            if report.info_removed {
                ", info removed"
            } else {
                ""
            }
        ))
    }

    fn render_platform_report(&self, report: &PlatformReport) -> io::Result<()> {
        let unknown = || "unknown".to_string();
        let bold = self.bold();
        let dim = self.dim();

        self.term.write_line(&format!(
            "{} ({})",
            bold.apply_to(&report.full_name),
            report.platform
        ))?;
        self.term.write_line(&format!(
            "  version:        {}",
            report.version.clone().unwrap_or_else(unknown)
        ))?;
        self.term.write_line(&format!(
            "  prefer 64-bit:  {}",
            report.prefer_64_bit.map_or_else(unknown, |b| b.to_string())
        ))?;
        self.term.write_line(&format!(
            "  X11:            {}",
            report.x11_installed.map_or_else(unknown, |b| b.to_string())
        ))?;
        if let Some(xcode) = &report.xcode_prefix {
            self.term
                .write_line(&format!("  xcode prefix:   {}", xcode.display()))?;
        }
        self.term.write_line(&format!(
            "  columns:        {}",
            report.terminal_columns.map_or_else(unknown, |c| c.to_string())
        ))?;

        self.term.write_line(&format!("{}", bold.apply_to("Tools")))?;
        for tool in &report.tools {
            let path = match &tool.path {
                Some(path) => path.display().to_string(),
                None => dim.apply_to("(unsupported)").to_string(),
            };
            self.term
                .write_line(&format!("  {:<14}{path}", tool.capability))?;
        }
        Ok(())
    }
}
