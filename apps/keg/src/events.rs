//! Event handling and user feedback

use console::{Style, Term};
use keg_events::{AppEvent, CleanEvent, EventMessage, GeneralEvent};

use crate::logging::log_event_with_tracing;

/// Forwards every event to tracing and renders the user-facing ones
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    verbose: bool,
    quiet: bool,
    /// Package of the clean in progress, used as the correlation id
    current_package: Option<String>,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, verbose: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            verbose,
            quiet,
            current_package: None,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        if let AppEvent::Clean(CleanEvent::Started { package, .. }) = &event {
            self.current_package = Some(package.clone());
        }

        let mut message = EventMessage::from_event(event);
        if let Some(package) = &self.current_package {
            message.meta = message.meta.with_correlation_id(package.clone());
        }
        log_event_with_tracing(&message);

        if !self.quiet {
            self.render(&message.event);
        }
    }

    fn render(&self, event: &AppEvent) {
        match event {
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                let line = match context {
                    Some(context) => format!("{message}: {context}"),
                    None => message.clone(),
                };
                self.show_warning(&line);
            }
            AppEvent::General(GeneralEvent::Error { message, .. }) => self.show_error(message),
            AppEvent::Clean(clean) => self.render_clean(clean),
            _ => {}
        }
    }

    fn render_clean(&self, event: &CleanEvent) {
        match event {
            CleanEvent::Started { package, prefix } => {
                self.show_heading(&format!("Cleaning {package} ({})", prefix.display()));
            }
            CleanEvent::FileSkipped { path, reason } => {
                self.show_warning(&format!("skipped {}: {reason}", path.display()));
            }
            CleanEvent::Failed { package, failure } => {
                self.show_error(&format!("cleaning {package} failed: {}", failure.message));
            }
            _ if !self.verbose => {}
            CleanEvent::DirectoryEntered { path } => {
                self.show_status(&format!("cleandir: {}", path.display()));
            }
            CleanEvent::BinaryStripped { path, .. } => {
                self.show_status(&format!("strip {}", path.display()));
            }
            CleanEvent::StaleFileRemoved { path } => {
                self.show_status(&format!("rm {}", path.display()));
            }
            CleanEvent::InfoRemoved { path } => {
                self.show_status(&format!("rm -r {}", path.display()));
            }
            CleanEvent::DirectoryPruned { path } => {
                self.show_status(&format!("rmdir: {} (empty)", path.display()));
            }
            CleanEvent::PermissionsSet { .. } | CleanEvent::Completed { .. } => {}
        }
    }

    fn style(&self, style: Style) -> Style {
        if self.colors_enabled {
            style
        } else {
            Style::new()
        }
    }

    fn show_heading(&self, message: &str) {
        let arrow = self.style(Style::new().blue().bold()).apply_to("==>");
        let text = self.style(Style::new().bold()).apply_to(message);
        let _ = self.term.write_line(&format!("{arrow} {text}"));
    }

    fn show_status(&self, message: &str) {
        let _ = self.term.write_line(message);
    }

    fn show_warning(&self, message: &str) {
        let label = self.style(Style::new().yellow().bold()).apply_to("Warning:");
        let _ = self.term.write_line(&format!("{label} {message}"));
    }

    fn show_error(&self, message: &str) {
        let label = self.style(Style::new().red().bold()).apply_to("Error:");
        let _ = self.term.write_line(&format!("{label} {message}"));
    }
}
